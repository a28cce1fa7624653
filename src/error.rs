use std::path::PathBuf;

use crate::bgzf::VirtualOffset;

/// Custom Result type for saimin operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the saimin library, encompassing every failure that
/// can occur while opening a BAM file or answering a region query.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors raised while locating the BAM file or its index
    #[error("Error opening reader: {0}")]
    OpenError(#[from] OpenError),

    /// Errors related to file magic and the BAM header
    #[error("Error processing header: {0}")]
    HeaderError(#[from] HeaderError),

    /// Errors raised while decoding BGZF blocks
    #[error("Error decoding BGZF block: {0}")]
    BlockError(#[from] BlockError),

    /// Errors related to the BAI index and region resolution
    #[error("Error processing index: {0}")]
    IndexError(#[from] IndexError),

    /// A single alignment record could not be decoded
    #[error("Corrupt record at virtual offset {offset}: {source}")]
    RecordError {
        offset: VirtualOffset,
        #[source]
        source: RecordError,
    },

    /// Errors raised by the reader lifecycle
    #[error("Error reading file: {0}")]
    ReadError(#[from] ReadError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Errors from assembling or serializing the Arrow batch
    #[error("Error encoding batch: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
}

/// A flat classification of every [`Error`].
///
/// Useful for callers that only need to branch on the failure class and not on
/// the diagnostic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound,
    IndexNotFound,
    UnsupportedFormatVersion,
    UnknownReference,
    InvalidRegion,
    CorruptBlock,
    TruncatedInput,
    IntegrityError,
    CorruptRecord,
    CorruptIndex,
    ReaderClosed,
    Io,
    Encoding,
}

impl Error {
    /// Classifies the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OpenError(OpenError::FileNotFound(_)) => ErrorKind::FileNotFound,
            Self::OpenError(OpenError::IndexNotFound { .. }) => ErrorKind::IndexNotFound,
            Self::HeaderError(err) => err.kind(),
            Self::BlockError(err) => err.kind(),
            Self::IndexError(err) => err.kind(),
            Self::RecordError { .. } => ErrorKind::CorruptRecord,
            Self::ReadError(ReadError::ReaderClosed) => ErrorKind::ReaderClosed,
            Self::IoError(_) => ErrorKind::Io,
            Self::ArrowError(_) => ErrorKind::Encoding,
        }
    }

    pub(crate) fn record(offset: VirtualOffset, source: RecordError) -> Self {
        Self::RecordError { offset, source }
    }
}

/// Errors raised while locating the input file pair
#[derive(thiserror::Error, Debug)]
pub enum OpenError {
    /// The BAM file does not exist
    #[error("No such file: {0}")]
    FileNotFound(PathBuf),

    /// No companion index could be found next to the BAM file
    #[error("No index found for {bam}; tried {tried:?}")]
    IndexNotFound { bam: PathBuf, tried: Vec<PathBuf> },
}

/// Errors specific to file magic numbers and the BAM header
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number does not match the expected value
    ///
    /// # Fields
    /// * `format` - The format that was expected (`BGZF`, `BAM` or `BAI`)
    /// * `found` - The leading bytes that were found instead
    #[error("Unsupported {format} format: magic bytes {found:?}")]
    UnsupportedFormatVersion {
        format: &'static str,
        found: Vec<u8>,
    },

    /// A length or count field of the header is negative
    #[error("Invalid {field} in BAM header: {value}")]
    InvalidField { field: &'static str, value: i32 },

    /// A reference name is not NUL-terminated or not valid UTF-8
    #[error("Invalid name for reference {0} in BAM header")]
    InvalidReferenceName(usize),
}
impl HeaderError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormatVersion { .. } => ErrorKind::UnsupportedFormatVersion,
            Self::InvalidField { .. } | Self::InvalidReferenceName(_) => ErrorKind::CorruptRecord,
        }
    }
}

/// Errors that can occur while decoding BGZF blocks
///
/// Every variant carries the compressed file offset of the offending block.
#[derive(thiserror::Error, Debug)]
pub enum BlockError {
    /// The gzip member header is not a BGZF block header
    #[error("Invalid BGZF block header at byte {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: &'static str },

    /// The block claims more bytes than the file holds
    #[error("Truncated BGZF block at byte {offset}: needs {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// The stream ended in the middle of a read
    #[error("Unexpected end of BGZF stream at virtual offset {0}")]
    UnexpectedEndOfStream(VirtualOffset),

    /// The DEFLATE payload could not be inflated
    #[error("Failed to inflate BGZF block at byte {offset}: {message}")]
    Inflate { offset: u64, message: String },

    /// The inflated size differs from the size stored in the block footer
    #[error("BGZF block at byte {offset} inflated to {actual} bytes, footer declares {expected}")]
    SizeMismatch {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// The CRC32 of the inflated data differs from the footer
    #[error("CRC32 mismatch in BGZF block at byte {offset}: expected {expected:#010x}, found {actual:#010x}")]
    ChecksumMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// A virtual offset points past the end of its block
    #[error("Virtual offset {offset} is outside its block of {block_len} bytes")]
    OffsetOutOfBlock {
        offset: VirtualOffset,
        block_len: usize,
    },
}
impl BlockError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } | Self::UnexpectedEndOfStream(_) => ErrorKind::TruncatedInput,
            Self::ChecksumMismatch { .. } => ErrorKind::IntegrityError,
            Self::InvalidHeader { .. }
            | Self::Inflate { .. }
            | Self::SizeMismatch { .. }
            | Self::OffsetOutOfBlock { .. } => ErrorKind::CorruptBlock,
        }
    }
}

/// Errors related to the BAI index and region resolution
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The requested reference is not present in the header or index
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// The region is malformed
    #[error("Invalid region: start ({start}) is greater than stop ({stop})")]
    InvalidRegion { start: u32, stop: u32 },

    /// The index ended before all declared entries were read
    #[error("Truncated index at byte {0}")]
    Truncated(usize),

    /// A count field of the index is negative
    #[error("Invalid {field} in index at byte {offset}: {value}")]
    InvalidCount {
        field: &'static str,
        offset: usize,
        value: i32,
    },
}
impl IndexError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownReference(_) => ErrorKind::UnknownReference,
            Self::InvalidRegion { .. } => ErrorKind::InvalidRegion,
            Self::Truncated(_) => ErrorKind::TruncatedInput,
            Self::InvalidCount { .. } => ErrorKind::CorruptIndex,
        }
    }
}

/// Inconsistencies found while decoding a single alignment record
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    /// The record is smaller than its fixed-size header
    #[error("Record size {0} is smaller than the fixed header")]
    InvalidBlockSize(i32),

    /// The variable-length fields do not fit in the record
    #[error("Record declares {required} bytes of fields but holds {available}")]
    SizeMismatch { required: usize, available: usize },

    /// The sequence length is negative
    #[error("Invalid sequence length: {0}")]
    InvalidSequenceLength(i32),

    /// The read name is empty, not NUL-terminated, or not UTF-8
    #[error("Invalid read name")]
    InvalidName,

    /// A CIGAR operation code is out of range
    #[error("Invalid CIGAR operation code: {0}")]
    InvalidCigarOp(u8),

    /// The auxiliary data is malformed
    #[error("Invalid auxiliary field: {0}")]
    InvalidAuxField(&'static str),
}

/// Errors raised by the reader lifecycle
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The reader has been closed
    #[error("Reader is closed")]
    ReaderClosed,
}
