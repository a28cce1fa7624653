//! # BAI index
//!
//! A BAI file assigns every record to the smallest bin of the UCSC binning
//! scheme that fully contains it, and stores for each bin the virtual offset
//! ranges ("chunks") holding its records. A linear index records, per 16 kbp
//! window, the lowest offset of any record overlapping that window, which
//! lets a query skip chunks that end before the region can start.
//!
//! Resolution is conservative: the chunks returned for a region are a
//! superset of those holding overlapping records, so decoded records still
//! need an exact overlap test.

mod bai;
mod bins;
mod chunk;

pub use bai::{Bin, Index, ReferenceIndex, ReferenceMetadata};
pub use bins::{linear_window, region_to_bins, MAX_POSITION, METADATA_BIN, MIN_SHIFT};
pub use chunk::{merge_chunks, Chunk};
