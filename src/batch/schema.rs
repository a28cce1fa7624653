use std::sync::{Arc, OnceLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

pub const REF: &str = "ref";
pub const START: &str = "start";
pub const END: &str = "end";
pub const NAME: &str = "name";
pub const CIGAR: &str = "cigar";
pub const SEQ: &str = "seq";
pub const QUAL: &str = "qual";

/// The fixed schema of every alignment batch:
///
/// | column | type                      | nullable |
/// |--------|---------------------------|----------|
/// | ref    | Dictionary(Int32, Utf8)   | no       |
/// | start  | Int32                     | no       |
/// | end    | Int32                     | yes      |
/// | name   | Utf8                      | no       |
/// | cigar  | Utf8                      | no       |
/// | seq    | Utf8                      | no       |
/// | qual   | Utf8                      | yes      |
pub fn alignment_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Field::new(
                    REF,
                    DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                    false,
                ),
                Field::new(START, DataType::Int32, false),
                Field::new(END, DataType::Int32, true),
                Field::new(NAME, DataType::Utf8, false),
                Field::new(CIGAR, DataType::Utf8, false),
                Field::new(SEQ, DataType::Utf8, false),
                Field::new(QUAL, DataType::Utf8, true),
            ]))
        })
        .clone()
}
