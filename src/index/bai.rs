use std::{fs, io, path::Path};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::bgzf::VirtualOffset;
use crate::error::{HeaderError, IndexError, Result};
use crate::BAI_MAGIC;

use super::bins::{linear_window, region_to_bins, METADATA_BIN};
use super::chunk::{merge_chunks, Chunk};

/// A bin of the hierarchical index and the chunks of records assigned to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    pub id: u32,
    pub chunks: Vec<Chunk>,
}

/// Per-reference summary stored in the BAI metadata pseudo-bin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceMetadata {
    /// Virtual offset range spanning every record placed on the reference
    pub span: Chunk,
    pub mapped: u64,
    pub unmapped: u64,
}

/// Index data for one reference sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    /// Bins sorted by id, addressed through binary search
    bins: Vec<Bin>,
    /// Linear index: lowest virtual offset of a record overlapping each 16 kbp window
    intervals: Vec<VirtualOffset>,
    metadata: Option<ReferenceMetadata>,
}
impl ReferenceIndex {
    #[must_use]
    pub fn bin(&self, id: u32) -> Option<&Bin> {
        self.bins
            .binary_search_by_key(&id, |bin| bin.id)
            .ok()
            .map(|i| &self.bins[i])
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&ReferenceMetadata> {
        self.metadata.as_ref()
    }

    /// Lower bound on the offset of any record overlapping a position
    #[must_use]
    pub fn min_offset(&self, position: u32) -> Option<VirtualOffset> {
        let window = linear_window(position);
        self.intervals
            .get(window)
            .or_else(|| self.intervals.last())
            .copied()
    }
}

/// A parsed BAI index.
///
/// Immutable once loaded; share it across threads behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    references: Vec<ReferenceIndex>,
    unplaced_unmapped: Option<u64>,
}
impl Index {
    /// Reads and parses a BAI file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a BAI index from its raw bytes
    ///
    /// ```text
    /// magic      "BAI\1"
    /// n_ref      i32
    /// per reference:
    ///   n_bin    i32
    ///   per bin: bin u32, n_chunk i32, (chunk_beg u64, chunk_end u64) * n_chunk
    ///   n_intv   i32
    ///   ioffset  u64 * n_intv
    /// n_no_coor  u64 (optional)
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BAI_MAGIC.len() || bytes[..BAI_MAGIC.len()] != *BAI_MAGIC {
            return Err(HeaderError::UnsupportedFormatVersion {
                format: "BAI",
                found: bytes[..bytes.len().min(BAI_MAGIC.len())].to_vec(),
            }
            .into());
        }

        let mut cursor = IndexCursor::new(bytes, BAI_MAGIC.len());
        let n_ref = cursor.read_count("reference count")?;
        let mut references = Vec::with_capacity(n_ref.min(1 << 16));
        for _ in 0..n_ref {
            references.push(read_reference(&mut cursor)?);
        }

        let unplaced_unmapped = if cursor.remaining() >= 8 {
            Some(cursor.read_u64()?)
        } else {
            None
        };

        debug!(
            "Loaded BAI index with {} references ({} bins)",
            references.len(),
            references.iter().map(ReferenceIndex::num_bins).sum::<usize>()
        );
        Ok(Self {
            references,
            unplaced_unmapped,
        })
    }

    #[must_use]
    pub fn num_references(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn reference(&self, reference_id: usize) -> Option<&ReferenceIndex> {
        self.references.get(reference_id)
    }

    /// Mapped/unmapped counts for a reference, if the index carries them
    #[must_use]
    pub fn reference_metadata(&self, reference_id: usize) -> Option<&ReferenceMetadata> {
        self.reference(reference_id)?.metadata()
    }

    /// Number of unmapped records without a reference, if recorded
    #[must_use]
    pub fn unplaced_unmapped_count(&self) -> Option<u64> {
        self.unplaced_unmapped
    }

    /// Resolves `[start, stop)` on a reference to the chunks that may hold
    /// overlapping records.
    ///
    /// The result is a superset of the chunks holding overlapping records,
    /// sorted by offset and merged so it can be read without seeking backwards.
    pub fn resolve(
        &self,
        reference_id: usize,
        start: u32,
        stop: u32,
    ) -> std::result::Result<Vec<Chunk>, IndexError> {
        if start > stop {
            return Err(IndexError::InvalidRegion { start, stop });
        }
        let Some(reference) = self.references.get(reference_id) else {
            return Err(IndexError::UnknownReference(format!(
                "reference id {reference_id}"
            )));
        };
        if start == stop {
            return Ok(Vec::new());
        }

        let mut bin_ids = Vec::new();
        region_to_bins(start, stop, &mut bin_ids);

        let mut chunks = Vec::new();
        for id in bin_ids {
            if let Some(bin) = reference.bin(id) {
                chunks.extend_from_slice(&bin.chunks);
            }
        }

        if let Some(min_offset) = reference.min_offset(start) {
            chunks.retain(|chunk| chunk.end > min_offset);
        }

        Ok(merge_chunks(chunks))
    }
}

fn read_reference(cursor: &mut IndexCursor<'_>) -> Result<ReferenceIndex> {
    let n_bin = cursor.read_count("bin count")?;
    let mut bins = Vec::with_capacity(n_bin.min(1 << 16));
    let mut metadata = None;

    for _ in 0..n_bin {
        let id = cursor.read_u32()?;
        let n_chunk = cursor.read_count("chunk count")?;
        let mut chunks = Vec::with_capacity(n_chunk.min(1 << 16));
        for _ in 0..n_chunk {
            let start = VirtualOffset::from_raw(cursor.read_u64()?);
            let end = VirtualOffset::from_raw(cursor.read_u64()?);
            chunks.push(Chunk::new(start, end));
        }

        if id == METADATA_BIN {
            // two pseudo-chunks: the offset span, then the mapped/unmapped counts
            if let [span, counts] = chunks.as_slice() {
                metadata = Some(ReferenceMetadata {
                    span: *span,
                    mapped: counts.start.as_raw(),
                    unmapped: counts.end.as_raw(),
                });
            }
            continue;
        }
        bins.push(Bin { id, chunks });
    }
    bins.sort_unstable_by_key(|bin| bin.id);

    let n_intv = cursor.read_count("interval count")?;
    let mut intervals = Vec::with_capacity(n_intv.min(1 << 16));
    for _ in 0..n_intv {
        intervals.push(VirtualOffset::from_raw(cursor.read_u64()?));
    }

    Ok(ReferenceIndex {
        bins,
        intervals,
        metadata,
    })
}

/// Little-endian reads over the index bytes, reporting the failing offset
struct IndexCursor<'a> {
    inner: io::Cursor<&'a [u8]>,
}
impl<'a> IndexCursor<'a> {
    fn new(bytes: &'a [u8], position: usize) -> Self {
        let mut inner = io::Cursor::new(bytes);
        inner.set_position(position as u64);
        Self { inner }
    }

    fn offset(&self) -> usize {
        self.inner.position() as usize
    }

    fn remaining(&self) -> usize {
        self.inner.get_ref().len().saturating_sub(self.offset())
    }

    fn read_i32(&mut self) -> std::result::Result<i32, IndexError> {
        let offset = self.offset();
        self.inner
            .read_i32::<LittleEndian>()
            .map_err(|_| IndexError::Truncated(offset))
    }

    fn read_u32(&mut self) -> std::result::Result<u32, IndexError> {
        let offset = self.offset();
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|_| IndexError::Truncated(offset))
    }

    fn read_u64(&mut self) -> std::result::Result<u64, IndexError> {
        let offset = self.offset();
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|_| IndexError::Truncated(offset))
    }

    fn read_count(&mut self, field: &'static str) -> std::result::Result<usize, IndexError> {
        let offset = self.offset();
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| IndexError::InvalidCount {
            field,
            offset,
            value,
        })
    }
}
