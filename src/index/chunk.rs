use crate::bgzf::VirtualOffset;

/// A contiguous span of the inflated BAM stream, `[start, end)` in virtual
/// offsets.
///
/// `start.compressed()` is the file offset of the first block to inflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chunk {
    pub start: VirtualOffset,
    pub end: VirtualOffset,
}
impl Chunk {
    #[must_use]
    pub fn new(start: VirtualOffset, end: VirtualOffset) -> Self {
        Self { start, end }
    }
}

/// Sorts chunks by start and merges those that overlap, touch, or share a
/// compressed block, so they can be read front to back without seeking
/// backwards or inflating a block twice.
pub fn merge_chunks(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    if chunks.len() < 2 {
        return chunks;
    }
    chunks.sort_unstable();

    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match merged.last_mut() {
            Some(current) if chunk.start.compressed() <= current.end.compressed() => {
                current.end = current.end.max(chunk.end);
            }
            _ => merged.push(chunk),
        }
    }
    merged
}
