use std::path::{Path, PathBuf};

use crate::ipc::IpcFormat;

/// Settings applied when opening a [`Reader`](crate::Reader)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Explicit index location; discovered next to the BAM file when unset
    pub index_path: Option<PathBuf>,
    /// Framing of the bytes returned by `fetch`
    pub ipc_format: IpcFormat,
    /// Whether to check the CRC32 of every inflated block
    pub verify_checksums: bool,
}
impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            index_path: None,
            ipc_format: IpcFormat::default(),
            verify_checksums: true,
        }
    }
}
impl ReaderOptions {
    #[must_use]
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::default()
    }
}

/// Builder for [`ReaderOptions`]
///
/// ```
/// use saimin::{IpcFormat, ReaderOptions};
///
/// let options = ReaderOptions::builder()
///     .index_path("sample.bam.bai")
///     .ipc_format(IpcFormat::Stream)
///     .build();
/// assert!(options.verify_checksums);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReaderOptionsBuilder {
    index_path: Option<PathBuf>,
    ipc_format: Option<IpcFormat>,
    verify_checksums: Option<bool>,
}
impl ReaderOptionsBuilder {
    /// Use this index instead of searching next to the BAM file
    #[must_use]
    pub fn index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_path = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn ipc_format(mut self, format: IpcFormat) -> Self {
        self.ipc_format = Some(format);
        self
    }

    /// Skip or enforce CRC32 checks on inflated blocks (enforced by default)
    #[must_use]
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = Some(verify);
        self
    }

    #[must_use]
    pub fn build(self) -> ReaderOptions {
        ReaderOptions {
            index_path: self.index_path,
            ipc_format: self.ipc_format.unwrap_or_default(),
            verify_checksums: self.verify_checksums.unwrap_or(true),
        }
    }
}
