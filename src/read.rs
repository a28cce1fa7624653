use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::record_batch::RecordBatch;
use log::{debug, warn};
use memmap2::Mmap;
use parking_lot::RwLock;

use crate::batch::BatchBuilder;
use crate::bgzf::{has_eof_marker, has_gzip_magic, BgzfReader};
use crate::core::{Header, ReferenceSequence};
use crate::error::{HeaderError, IndexError, OpenError, ReadError, Result};
use crate::filter::Region;
use crate::index::Index;
use crate::ipc::encode_batch;
use crate::options::ReaderOptions;
use crate::query::{Query, RegionRecords};

/// A shared read-only memory map of a BAM file
#[derive(Clone)]
pub(crate) struct MappedBam(Arc<Mmap>);
impl AsRef<[u8]> for MappedBam {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An open BAM file and its BAI index, answering region queries.
///
/// The header and index are parsed once at open and shared by every query.
/// All query methods take `&self`, so one reader can serve concurrent fetches
/// from several threads.
///
/// ```no_run
/// use saimin::Reader;
///
/// let reader = Reader::open("sample.bam")?;
/// let ipc = reader.fetch("chr1", 0, 100_000)?;
/// reader.close();
/// # Ok::<(), saimin::Error>(())
/// ```
pub struct Reader {
    path: PathBuf,
    index_path: PathBuf,
    header: Arc<Header>,
    index: Arc<Index>,
    options: ReaderOptions,

    /// `None` once closed
    data: RwLock<Option<MappedBam>>,
}
impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("path", &self.path)
            .field("index_path", &self.index_path)
            .field("references", &self.header.references().len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
impl Reader {
    /// Opens a BAM file with default options, locating its index by name
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReaderOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OpenError::FileNotFound(path.to_path_buf()).into());
        }
        let index_path = match &options.index_path {
            Some(explicit) if explicit.is_file() => explicit.clone(),
            Some(explicit) => {
                return Err(OpenError::IndexNotFound {
                    bam: path.to_path_buf(),
                    tried: vec![explicit.clone()],
                }
                .into())
            }
            None => find_index(path)?,
        };

        let file = fs::File::open(path)?;
        // Load the mmap
        let mmap = unsafe { Mmap::map(&file) }?;
        let data = MappedBam(Arc::new(mmap));

        let bytes = data.as_ref();
        if !has_gzip_magic(bytes) {
            return Err(HeaderError::UnsupportedFormatVersion {
                format: "BGZF",
                found: bytes[..bytes.len().min(4)].to_vec(),
            }
            .into());
        }
        if !has_eof_marker(bytes) {
            warn!("{} is missing the BGZF end-of-file marker", path.display());
        }

        let mut reader = BgzfReader::new(data.clone(), options.verify_checksums);
        let header = Header::read(&mut reader)?;

        let index = Index::from_path(&index_path)?;
        if index.num_references() != header.references().len() {
            warn!(
                "{} indexes {} references but the BAM header declares {}",
                index_path.display(),
                index.num_references(),
                header.references().len()
            );
        }

        debug!(
            "Opened {} with index {} ({} references)",
            path.display(),
            index_path.display(),
            header.references().len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            index_path,
            header: Arc::new(header),
            index: Arc::new(index),
            options,
            data: RwLock::new(Some(data)),
        })
    }

    /// Returns the records overlapping `chrom:[start, stop)` as one Arrow IPC
    /// message, framed per [`ReaderOptions::ipc_format`]
    pub fn fetch(&self, chrom: &str, start: u32, stop: u32) -> Result<Vec<u8>> {
        let batch = self.fetch_batch(chrom, start, stop)?;
        encode_batch(&batch, self.options.ipc_format)
    }

    /// Returns the records overlapping `chrom:[start, stop)` as an Arrow batch
    pub fn fetch_batch(&self, chrom: &str, start: u32, stop: u32) -> Result<RecordBatch> {
        let mut records = self.region_records(chrom, start, stop)?;
        let mut builder = BatchBuilder::default();
        while let Some(record) = records.next_record()? {
            builder.push(chrom, &record)?;
        }
        debug!(
            "{chrom}:{start}-{stop}: kept {} of {} decoded records",
            records.matched(),
            records.scanned()
        );
        builder.finish()
    }

    /// Lazily yields owned copies of the records overlapping `chrom:[start, stop)`
    pub fn query(&self, chrom: &str, start: u32, stop: u32) -> Result<Query> {
        let records = self.region_records(chrom, start, stop)?;
        Ok(Query::new(records, self.header.clone()))
    }

    fn region_records(
        &self,
        chrom: &str,
        start: u32,
        stop: u32,
    ) -> Result<RegionRecords<MappedBam>> {
        let data = self.data()?;
        let region = self.region(chrom, start, stop)?;
        let chunks = self
            .index
            .resolve(region.reference_id, region.start, region.stop)?;
        debug!(
            "Resolved {chrom}:{}-{} to {} chunks",
            region.start,
            region.stop,
            chunks.len()
        );
        let reader = BgzfReader::new(data, self.options.verify_checksums);
        Ok(RegionRecords::new(reader, chunks, region))
    }

    /// Validates a query and clamps it to the reference length
    fn region(&self, chrom: &str, start: u32, stop: u32) -> Result<Region> {
        if start > stop {
            return Err(IndexError::InvalidRegion { start, stop }.into());
        }
        let unknown = || IndexError::UnknownReference(chrom.to_string());
        let reference_id = self.header.reference_id(chrom).ok_or_else(unknown)?;
        if self.index.reference(reference_id).is_none() {
            return Err(unknown().into());
        }
        let length = self.header.references()[reference_id].length;
        let stop = stop.min(length);
        Ok(Region::new(reference_id, start.min(stop), stop)?)
    }

    fn data(&self) -> Result<MappedBam> {
        self.data
            .read()
            .clone()
            .ok_or_else(|| ReadError::ReaderClosed.into())
    }

    /// Releases the memory map. Later queries fail with `ReaderClosed`;
    /// queries already running finish on their own handle.
    pub fn close(&self) {
        if self.data.write().take().is_some() {
            debug!("Closed {}", self.path.display());
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.data.read().is_none()
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reference names and lengths, in id order
    #[must_use]
    pub fn references(&self) -> &[ReferenceSequence] {
        self.header.references()
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[must_use]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }
}

/// Index locations tried for a BAM file, in order: `<path>.bai`, then the
/// path with its `.bam` extension replaced by `.bai`
#[must_use]
pub fn index_candidates(bam: &Path) -> Vec<PathBuf> {
    let mut appended = bam.as_os_str().to_owned();
    appended.push(".bai");
    let mut candidates = vec![PathBuf::from(appended)];
    if bam.extension().is_some_and(|ext| ext == "bam") {
        candidates.push(bam.with_extension("bai"));
    }
    candidates
}

fn find_index(bam: &Path) -> Result<PathBuf> {
    let candidates = index_candidates(bam);
    match candidates.iter().find(|path| path.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(OpenError::IndexNotFound {
            bam: bam.to_path_buf(),
            tried: candidates,
        }
        .into()),
    }
}
