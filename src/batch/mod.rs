//! Columnar assembly of alignment records into Arrow batches.

mod builder;
mod schema;

pub use builder::BatchBuilder;
pub use schema::{alignment_schema, CIGAR, END, NAME, QUAL, REF, SEQ, START};
