mod cigar;
mod header;
mod record;
mod sequence;

pub use cigar::{Cigar, Kind, Op};
pub use header::{Header, ReferenceSequence};
pub use record::{
    AlignmentRecord, Flags, Record, FIXED_SIZE, FLAG_PAIRED, FLAG_REVERSE, FLAG_SECONDARY,
    FLAG_SUPPLEMENTARY, FLAG_UNMAPPED,
};
pub use sequence::{Quality, Sequence, BASES, MISSING_QUALITY};
