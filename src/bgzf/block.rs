use bytemuck::{Pod, Zeroable};
use flate2::{Crc, Decompress, FlushDecompress, Status};

use crate::error::BlockError;

/// Size of the fixed gzip member header preceding the extra field
pub const MEMBER_HEADER_SIZE: usize = 12;

/// Size of the `CRC32` + `ISIZE` footer
pub const FOOTER_SIZE: usize = 8;

/// Maximum size of a BGZF block, both compressed and inflated
pub const MAX_BLOCK_SIZE: usize = 1 << 16;

/// The empty block terminating every well-formed BGZF file
pub const EOF_MARKER: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const FLAG_EXTRA: u8 = 1 << 2;

/// The fixed part of a gzip member header.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct MemberHeader {
    magic: [u8; 2],
    method: u8,
    flags: u8,
    mtime: [u8; 4],
    extra_flags: u8,
    os: u8,
    xlen: [u8; 2],
}
impl MemberHeader {
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self, BlockError> {
        if bytes.len() < MEMBER_HEADER_SIZE {
            return Err(BlockError::Truncated {
                offset,
                needed: MEMBER_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let header: Self = *bytemuck::from_bytes(&bytes[..MEMBER_HEADER_SIZE]);
        if header.magic != GZIP_MAGIC {
            return Err(invalid(offset, "bad gzip magic"));
        }
        if header.method != METHOD_DEFLATE {
            return Err(invalid(offset, "compression method is not DEFLATE"));
        }
        if header.flags & FLAG_EXTRA == 0 {
            return Err(invalid(offset, "missing extra field"));
        }
        Ok(header)
    }

    /// Length of the extra field following the fixed header
    #[must_use]
    pub fn extra_len(&self) -> usize {
        u16::from_le_bytes(self.xlen) as usize
    }
}

/// Returns true if the bytes start with the gzip magic number
#[must_use]
pub fn has_gzip_magic(bytes: &[u8]) -> bool {
    bytes.len() >= GZIP_MAGIC.len() && bytes[..GZIP_MAGIC.len()] == GZIP_MAGIC
}

/// Returns true if the bytes end with the BGZF end-of-file marker
#[must_use]
pub fn has_eof_marker(bytes: &[u8]) -> bool {
    bytes.ends_with(&EOF_MARKER)
}

fn invalid(offset: u64, reason: &'static str) -> BlockError {
    BlockError::InvalidHeader { offset, reason }
}

/// Reads the total size of the block starting at `src[0]` from its `BC` subfield.
fn block_size(src: &[u8], offset: u64) -> Result<(usize, usize), BlockError> {
    let header = MemberHeader::from_bytes(src, offset)?;
    let header_len = MEMBER_HEADER_SIZE + header.extra_len();
    if src.len() < header_len {
        return Err(BlockError::Truncated {
            offset,
            needed: header_len,
            available: src.len(),
        });
    }

    let extra = &src[MEMBER_HEADER_SIZE..header_len];
    let mut pos = 0;
    let mut bsize = None;
    while pos + 4 <= extra.len() {
        let slen = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
        if extra[pos] == b'B' && extra[pos + 1] == b'C' && slen == 2 && pos + 6 <= extra.len() {
            bsize = Some(u16::from_le_bytes([extra[pos + 4], extra[pos + 5]]) as usize + 1);
            break;
        }
        pos += 4 + slen;
    }
    let Some(bsize) = bsize else {
        return Err(invalid(offset, "missing BC subfield"));
    };
    if bsize < header_len + FOOTER_SIZE {
        return Err(invalid(offset, "block size smaller than its header"));
    }
    Ok((bsize, header_len))
}

/// Inflates BGZF blocks.
///
/// Holds a reusable inflate state so consecutive blocks do not reallocate it.
pub struct BlockDecoder {
    inflater: Decompress,
    verify_checksums: bool,
}
impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}
impl BlockDecoder {
    #[must_use]
    pub fn new(verify_checksums: bool) -> Self {
        Self {
            inflater: Decompress::new(false),
            verify_checksums,
        }
    }

    /// Inflates the single block starting at `src[0]` and appends it to `dst`.
    ///
    /// `offset` is the position of `src[0]` in the compressed file and is only
    /// used for diagnostics. Returns the compressed size of the block.
    ///
    /// On failure `dst` is left exactly as it was.
    pub fn decode(
        &mut self,
        src: &[u8],
        offset: u64,
        dst: &mut Vec<u8>,
    ) -> Result<usize, BlockError> {
        let (bsize, header_len) = block_size(src, offset)?;
        if src.len() < bsize {
            return Err(BlockError::Truncated {
                offset,
                needed: bsize,
                available: src.len(),
            });
        }

        let payload = &src[header_len..bsize - FOOTER_SIZE];
        let footer = &src[bsize - FOOTER_SIZE..bsize];
        let expected_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let expected_len = u32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]) as usize;
        if expected_len > MAX_BLOCK_SIZE {
            return Err(invalid(offset, "declared inflated size exceeds 64 KiB"));
        }

        // empty blocks (the EOF marker among them) carry nothing to inflate
        if expected_len == 0 {
            return if expected_crc == 0 {
                Ok(bsize)
            } else {
                Err(BlockError::ChecksumMismatch {
                    offset,
                    expected: expected_crc,
                    actual: 0,
                })
            };
        }

        let start = dst.len();
        dst.reserve(expected_len);
        self.inflater.reset(false);
        let status = self
            .inflater
            .decompress_vec(payload, dst, FlushDecompress::Finish)
            .map_err(|e| {
                dst.truncate(start);
                BlockError::Inflate {
                    offset,
                    message: e.to_string(),
                }
            })?;

        let actual_len = dst.len() - start;
        if status != Status::StreamEnd || actual_len != expected_len {
            dst.truncate(start);
            return Err(BlockError::SizeMismatch {
                offset,
                expected: expected_len,
                actual: actual_len,
            });
        }

        if self.verify_checksums {
            let mut crc = Crc::new();
            crc.update(&dst[start..]);
            if crc.sum() != expected_crc {
                let actual = crc.sum();
                dst.truncate(start);
                return Err(BlockError::ChecksumMismatch {
                    offset,
                    expected: expected_crc,
                    actual,
                });
            }
        }

        Ok(bsize)
    }

    /// Inflates every block in `src` and appends them to `dst` in order.
    ///
    /// `src` must start on a block boundary and end on one. Returns the number
    /// of blocks decoded.
    pub fn decode_range(
        &mut self,
        src: &[u8],
        offset: u64,
        dst: &mut Vec<u8>,
    ) -> Result<usize, BlockError> {
        let start = dst.len();
        let mut pos = 0;
        let mut num_blocks = 0;
        while pos < src.len() {
            match self.decode(&src[pos..], offset + pos as u64, dst) {
                Ok(bsize) => pos += bsize,
                Err(e) => {
                    dst.truncate(start);
                    return Err(e);
                }
            }
            num_blocks += 1;
        }
        Ok(num_blocks)
    }
}
