//! The UCSC binning scheme shared by BAI indices and BAM records.
//!
//! The first 2^29 positions of a reference are covered by a six-level tree of
//! bins. Level 0 is a single 512 Mbp bin, and every further level splits each
//! bin into eight, down to 16 kbp leaves at level 5:
//!
//! | level | first bin | bin span |
//! |-------|-----------|----------|
//! | 0     | 0         | 512 Mbp  |
//! | 1     | 1         | 64 Mbp   |
//! | 2     | 9         | 8 Mbp    |
//! | 3     | 73        | 1 Mbp    |
//! | 4     | 585       | 128 kbp  |
//! | 5     | 4681      | 16 kbp   |

/// Shift of the smallest bin (16 kbp), also the linear index window size
pub const MIN_SHIFT: u32 = 14;

/// Largest position addressable by the binning scheme
pub const MAX_POSITION: u32 = 1 << 29;

/// Pseudo-bin carrying per-reference metadata in a BAI file
pub const METADATA_BIN: u32 = 37450;

/// `(first bin id, shift)` for levels 1 through 5
const LEVELS: [(u32, u32); 5] = [(1, 26), (9, 23), (73, 20), (585, 17), (4681, 14)];

/// Fills `bins` with every bin that may hold a record overlapping `[start, stop)`.
///
/// `bins` is cleared first. An empty interval yields no bins.
pub fn region_to_bins(start: u32, stop: u32, bins: &mut Vec<u32>) {
    bins.clear();
    if start >= stop || start >= MAX_POSITION {
        return;
    }
    let end = stop.min(MAX_POSITION) - 1;

    bins.push(0);
    for (first, shift) in LEVELS {
        let lo = first + (start >> shift);
        let hi = first + (end >> shift);
        bins.extend(lo..=hi);
    }
}

/// Index of the linear-index window holding `position`
#[must_use]
pub fn linear_window(position: u32) -> usize {
    (position >> MIN_SHIFT) as usize
}
