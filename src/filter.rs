use crate::core::Record;
use crate::error::IndexError;

/// A half-open interval `[start, stop)` on one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub reference_id: usize,
    pub start: u32,
    pub stop: u32,
}
impl Region {
    pub fn new(reference_id: usize, start: u32, stop: u32) -> Result<Self, IndexError> {
        if start > stop {
            return Err(IndexError::InvalidRegion { start, stop });
        }
        Ok(Self {
            reference_id,
            start,
            stop,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Whether the record's reference span intersects the region.
    ///
    /// Unmapped records never overlap. A record covering no reference bases
    /// is treated as covering its start position.
    #[must_use]
    pub fn overlaps(&self, record: &Record<'_>) -> bool {
        if record.is_unmapped() || record.reference_id() != Some(self.reference_id) {
            return false;
        }
        let Some((start, end)) = reference_span(record) else {
            return false;
        };
        start < i64::from(self.stop) && end > i64::from(self.start)
    }

    /// Whether no record at or after this one in a coordinate-sorted file can
    /// overlap the region
    #[must_use]
    pub fn is_passed_by(&self, record: &Record<'_>) -> bool {
        match record.reference_id() {
            // unplaced records sort last
            None => true,
            Some(id) if id != self.reference_id => id > self.reference_id,
            Some(_) => record
                .position()
                .is_some_and(|pos| i64::from(pos) >= i64::from(self.stop)),
        }
    }
}

/// `[start, end)` on the reference, widened to one base when the alignment
/// consumes no reference
fn reference_span(record: &Record<'_>) -> Option<(i64, i64)> {
    let start = i64::from(record.position()?);
    let len = i64::from(record.reference_len().max(1));
    Some((start, start + len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordSpec;

    fn check(spec: RecordSpec, region: Region) -> bool {
        let bytes = spec.encode();
        let record = Record::try_from_bytes(&bytes[4..]).unwrap();
        region.overlaps(&record)
    }

    fn region(start: u32, stop: u32) -> Region {
        Region::new(0, start, stop).unwrap()
    }

    #[test]
    fn test_overlap_boundaries() {
        // record covers [500, 600)
        let rec = || RecordSpec::mapped(0, 500, "r", &[(100, b'M')]);
        assert!(check(rec(), region(0, 100_000)));
        assert!(check(rec(), region(599, 700)));
        assert!(check(rec(), region(400, 501)));
        assert!(!check(rec(), region(600, 700)));
        assert!(!check(rec(), region(400, 500)));
    }

    #[test]
    fn test_span_uses_reference_ops_only() {
        // 10S 20M 5I 10D: span [100, 130)
        let rec = || RecordSpec::mapped(0, 100, "r", &[(10, b'S'), (20, b'M'), (5, b'I'), (10, b'D')]);
        assert!(check(rec(), region(129, 140)));
        assert!(!check(rec(), region(130, 140)));
        assert!(!check(rec(), region(90, 100)));
    }

    #[test]
    fn test_zero_span_record() {
        let rec = || RecordSpec::mapped(0, 100, "r", &[(5, b'S')]);
        assert!(check(rec(), region(100, 101)));
        assert!(!check(rec(), region(101, 200)));
    }

    #[test]
    fn test_other_reference() {
        assert!(!check(
            RecordSpec::mapped(1, 500, "r", &[(100, b'M')]),
            region(0, 100_000)
        ));
    }

    #[test]
    fn test_unmapped_excluded() {
        assert!(!check(RecordSpec::unmapped("u"), region(0, u32::MAX)));
        // placed next to its mate but flagged unmapped
        let placed = RecordSpec::mapped(0, 500, "u", &[]).with_flags(0x4 | 0x1);
        assert!(!check(placed, region(0, 100_000)));
    }

    #[test]
    fn test_is_passed_by() {
        let r = Region::new(1, 100, 200).unwrap();
        let decode = |spec: RecordSpec| spec.encode();
        let before = decode(RecordSpec::mapped(1, 150, "a", &[(10, b'M')]));
        let after = decode(RecordSpec::mapped(1, 200, "b", &[(10, b'M')]));
        let next_ref = decode(RecordSpec::mapped(2, 0, "c", &[(10, b'M')]));
        let prev_ref = decode(RecordSpec::mapped(0, 900, "d", &[(10, b'M')]));
        let unplaced = decode(RecordSpec::unmapped("e"));

        let passed = |bytes: &Vec<u8>| r.is_passed_by(&Record::try_from_bytes(&bytes[4..]).unwrap());
        assert!(!passed(&before));
        assert!(passed(&after));
        assert!(passed(&next_ref));
        assert!(!passed(&prev_ref));
        assert!(passed(&unplaced));
    }

    #[test]
    fn test_invalid_region() {
        assert!(matches!(
            Region::new(0, 10, 5),
            Err(IndexError::InvalidRegion { start: 10, stop: 5 })
        ));
        assert!(region(5, 5).is_empty());
    }
}
