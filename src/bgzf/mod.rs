//! # BGZF
//!
//! BAM files are stored as a series of concatenated gzip members ("blocks"),
//! each holding at most 64 KiB of inflated data. Every block records its own
//! compressed size in a `BC` extra subfield and its inflated size and CRC32 in
//! an 8-byte footer, so blocks can be located and inflated independently.
//!
//! ```text
//! ┌────────────┬──────────────┬─────────────────┬─────────┬─────────┐
//! │ gzip hdr   │ extra (BC)   │ DEFLATE payload │ CRC32   │ ISIZE   │
//! │ 12 bytes   │ XLEN bytes   │ variable        │ 4 bytes │ 4 bytes │
//! └────────────┴──────────────┴─────────────────┴─────────┴─────────┘
//! ```
//!
//! Positions in the inflated stream are addressed by a [`VirtualOffset`].

mod block;
mod reader;
mod virtual_offset;

pub use block::{
    has_eof_marker, has_gzip_magic, BlockDecoder, MemberHeader, EOF_MARKER, FOOTER_SIZE,
    MAX_BLOCK_SIZE, MEMBER_HEADER_SIZE,
};
pub use reader::BgzfReader;
pub use virtual_offset::VirtualOffset;
