//! # saimin
//!
//! Indexed region queries over BAM alignment files, returned as Arrow IPC.
//!
//! A [`Reader`] memory-maps a BAM file, parses its header and BAI index once,
//! and answers `fetch(chrom, start, stop)` calls. Each call resolves the
//! half-open interval to BGZF chunks through the index, inflates and decodes
//! the records found there, keeps those whose reference span overlaps the
//! interval, and assembles them into one Arrow record batch:
//!
//! ```text
//! Reader ─▶ Index::resolve ─▶ BgzfReader ─▶ Record ─▶ Region::overlaps ─▶ BatchBuilder ─▶ encode_batch
//! ```
//!
//! The batch is serialized as a self-contained Arrow IPC message readable by
//! any Arrow implementation (`pyarrow.ipc.open_file`, `polars.read_ipc`, ...).

pub mod batch;
pub mod bgzf;
mod core;
mod error;
mod filter;
pub mod index;
mod ipc;
mod options;
mod query;
mod read;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
pub(crate) mod test_utils;

pub use self::core::{
    AlignmentRecord, Cigar, Flags, Header, Kind, Op, Quality, Record, ReferenceSequence, Sequence,
    BASES, FLAG_PAIRED, FLAG_REVERSE, FLAG_SECONDARY, FLAG_SUPPLEMENTARY, FLAG_UNMAPPED,
    MISSING_QUALITY,
};
pub use error::{
    BlockError, Error, ErrorKind, HeaderError, IndexError, OpenError, ReadError, RecordError,
    Result,
};
pub use filter::Region;
pub use index::Index;
pub use ipc::{decode_batches, encode_batch, IpcFormat};
pub use options::{ReaderOptions, ReaderOptionsBuilder};
pub use query::{Query, RegionRecords};
pub use read::{index_candidates, Reader};

/// Magic number opening the inflated BAM stream
pub const BAM_MAGIC: &[u8; 4] = b"BAM\x01";

/// Magic number opening a BAI index
pub const BAI_MAGIC: &[u8; 4] = b"BAI\x01";
