use std::io::Cursor;

use arrow::ipc::reader::{FileReader, StreamReader};
use arrow::ipc::writer::{FileWriter, StreamWriter};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::Result;

/// Arrow IPC framing of the encoded payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IpcFormat {
    /// Random-access file format with a trailing footer (`ARROW1` magic)
    #[default]
    File,
    /// Streaming format: schema message, batch message, end-of-stream marker
    Stream,
}

/// Serializes one batch together with its schema into a self-contained
/// Arrow IPC message
pub fn encode_batch(batch: &RecordBatch, format: IpcFormat) -> Result<Vec<u8>> {
    let schema = batch.schema();
    let bytes = match format {
        IpcFormat::File => {
            let mut writer = FileWriter::try_new(Vec::new(), &schema)?;
            writer.write(batch)?;
            writer.finish()?;
            writer.into_inner()?
        }
        IpcFormat::Stream => {
            let mut writer = StreamWriter::try_new(Vec::new(), &schema)?;
            writer.write(batch)?;
            writer.finish()?;
            writer.into_inner()?
        }
    };
    debug!(
        "Encoded {} rows as {} bytes of Arrow IPC ({:?})",
        batch.num_rows(),
        bytes.len(),
        format
    );
    Ok(bytes)
}

/// Reads every batch back out of an encoded payload
pub fn decode_batches(bytes: &[u8], format: IpcFormat) -> Result<Vec<RecordBatch>> {
    let batches = match format {
        IpcFormat::File => FileReader::try_new(Cursor::new(bytes), None)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        IpcFormat::Stream => StreamReader::try_new(Cursor::new(bytes), None)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(batches)
}
