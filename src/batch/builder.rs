use std::sync::Arc;

use arrow::array::{
    ArrayBuilder, ArrayRef, Int32Builder, StringBuilder, StringDictionaryBuilder,
};
use arrow::datatypes::Int32Type;
use arrow::record_batch::RecordBatch;

use crate::core::Record;
use crate::error::Result;

use super::schema::alignment_schema;

/// Accumulates records column by column in a single pass.
///
/// Reference names go through a dictionary keyed by first occurrence, so each
/// distinct name is stored once per batch.
pub struct BatchBuilder {
    refs: StringDictionaryBuilder<Int32Type>,
    starts: Int32Builder,
    ends: Int32Builder,
    names: StringBuilder,
    cigars: StringBuilder,
    seqs: StringBuilder,
    quals: StringBuilder,

    /// Reused text buffer for rendered fields
    scratch: String,
}
impl Default for BatchBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
impl BatchBuilder {
    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            refs: StringDictionaryBuilder::new(),
            starts: Int32Builder::with_capacity(rows),
            ends: Int32Builder::with_capacity(rows),
            names: StringBuilder::with_capacity(rows, rows * 20),
            cigars: StringBuilder::with_capacity(rows, rows * 8),
            seqs: StringBuilder::with_capacity(rows, rows * 150),
            quals: StringBuilder::with_capacity(rows, rows * 150),
            scratch: String::new(),
        }
    }

    /// Number of rows appended since the last [`finish`](Self::finish)
    #[must_use]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one row
    pub fn push(&mut self, reference_name: &str, record: &Record<'_>) -> Result<()> {
        self.refs.append(reference_name)?;
        self.starts.append_value(record.position().unwrap_or(-1));
        self.ends.append_option(record.end());
        self.names.append_value(record.name());

        self.scratch.clear();
        record.cigar().write_to(&mut self.scratch);
        self.cigars.append_value(&self.scratch);

        self.scratch.clear();
        record.sequence().write_to(&mut self.scratch);
        self.seqs.append_value(&self.scratch);

        match record.quality() {
            Some(quality) => {
                self.scratch.clear();
                quality.write_to(&mut self.scratch);
                self.quals.append_value(&self.scratch);
            }
            None => self.quals.append_null(),
        }
        Ok(())
    }

    /// Assembles the appended rows into a batch and resets the builder
    pub fn finish(&mut self) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.refs.finish()),
            Arc::new(self.starts.finish()),
            Arc::new(self.ends.finish()),
            Arc::new(self.names.finish()),
            Arc::new(self.cigars.finish()),
            Arc::new(self.seqs.finish()),
            Arc::new(self.quals.finish()),
        ];
        Ok(RecordBatch::try_new(alignment_schema(), columns)?)
    }
}
