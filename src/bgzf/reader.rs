use crate::error::{BlockError, Result};

use super::{BlockDecoder, VirtualOffset};

/// A seekable cursor over the inflated contents of an in-memory BGZF file.
///
/// Blocks are inflated one at a time as the cursor advances; seeking within
/// the currently loaded block does not inflate it again.
pub struct BgzfReader<S> {
    source: S,
    decoder: BlockDecoder,

    /// Inflated data of the current block
    block: Vec<u8>,
    /// Compressed offset of the current block
    block_offset: u64,
    /// Compressed size of the current block (0 when nothing is loaded)
    block_size: usize,
    /// Read position within `block`
    pos: usize,
}
impl<S: AsRef<[u8]>> BgzfReader<S> {
    pub fn new(source: S, verify_checksums: bool) -> Self {
        Self {
            source,
            decoder: BlockDecoder::new(verify_checksums),
            block: Vec::new(),
            block_offset: 0,
            block_size: 0,
            pos: 0,
        }
    }

    /// The virtual offset of the next byte to be read.
    ///
    /// At the end of a block this reports the start of the following block,
    /// matching the offsets written into BAI chunks.
    #[must_use]
    pub fn virtual_offset(&self) -> VirtualOffset {
        if self.block_size > 0 && self.pos == self.block.len() {
            VirtualOffset::new(self.block_offset + self.block_size as u64, 0)
        } else {
            VirtualOffset::new(self.block_offset, self.pos as u16)
        }
    }

    /// Positions the cursor at the given virtual offset.
    pub fn seek(&mut self, offset: VirtualOffset) -> Result<()> {
        let loaded = self.block_size > 0 && self.block_offset == offset.compressed();
        if !loaded {
            self.load_block(offset.compressed())?;
        }
        let uoffset = offset.uncompressed() as usize;
        if uoffset > self.block.len() {
            return Err(BlockError::OffsetOutOfBlock {
                offset,
                block_len: self.block.len(),
            }
            .into());
        }
        self.pos = uoffset;
        Ok(())
    }

    /// Inflates the block at `offset`; past the end of the file this leaves an
    /// empty block in place.
    fn load_block(&mut self, offset: u64) -> Result<()> {
        let data = self.source.as_ref();
        self.block.clear();
        self.block_offset = offset;
        self.block_size = 0;
        self.pos = 0;
        if offset as usize >= data.len() {
            return Ok(());
        }
        self.block_size = self
            .decoder
            .decode(&data[offset as usize..], offset, &mut self.block)?;
        Ok(())
    }

    /// Returns the unread remainder of the current block, advancing over
    /// exhausted and empty blocks. An empty slice signals the end of the file.
    pub fn fill_buf(&mut self) -> Result<&[u8]> {
        while self.pos == self.block.len() {
            if self.block_size == 0 && self.block_offset as usize >= self.source.as_ref().len() {
                break;
            }
            let next = self.block_offset + self.block_size as u64;
            self.load_block(next)?;
            if self.block_size == 0 {
                break;
            }
        }
        Ok(&self.block[self.pos..])
    }

    pub fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.block.len());
    }

    /// Fills `buf` completely, crossing block boundaries as needed.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.read_exact_or_eof(buf)? {
            Ok(())
        } else {
            Err(BlockError::UnexpectedEndOfStream(self.virtual_offset()).into())
        }
    }

    /// Replaces the contents of `dst` with the next `len` bytes.
    ///
    /// Grows `dst` only as data arrives, so a corrupt length cannot force a
    /// huge allocation up front.
    pub fn read_into(&mut self, len: usize, dst: &mut Vec<u8>) -> Result<()> {
        dst.clear();
        while dst.len() < len {
            let available = self.fill_buf()?;
            if available.is_empty() {
                return Err(BlockError::UnexpectedEndOfStream(self.virtual_offset()).into());
            }
            let n = available.len().min(len - dst.len());
            dst.extend_from_slice(&available[..n]);
            self.consume(n);
        }
        Ok(())
    }

    /// Like [`read_exact`](Self::read_exact), but returns `Ok(false)` when the
    /// stream is already exhausted before the first byte.
    ///
    /// Running out of data part way through `buf` is still an error.
    pub fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let available = self.fill_buf()?;
            if available.is_empty() {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(BlockError::UnexpectedEndOfStream(self.virtual_offset()).into());
            }
            let n = available.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            self.consume(n);
            filled += n;
        }
        Ok(true)
    }
}
