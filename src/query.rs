use std::sync::Arc;

use crate::bgzf::{BgzfReader, VirtualOffset};
use crate::core::{AlignmentRecord, Header, Record, FIXED_SIZE};
use crate::error::{Error, RecordError, Result};
use crate::filter::Region;
use crate::index::Chunk;
use crate::read::MappedBam;

/// Pull-based scan of the records overlapping a region.
///
/// Walks the resolved chunks in file order, decodes one record at a time into
/// a reused buffer and yields only those passing the overlap test. The scan
/// stops early once a record sorts past the region.
pub struct RegionRecords<S> {
    reader: BgzfReader<S>,
    chunks: std::vec::IntoIter<Chunk>,
    current: Option<Chunk>,
    region: Region,

    /// Raw bytes of the last record read, without `block_size`
    buf: Vec<u8>,
    done: bool,

    scanned: usize,
    matched: usize,
}
impl<S: AsRef<[u8]>> RegionRecords<S> {
    pub fn new(reader: BgzfReader<S>, chunks: Vec<Chunk>, region: Region) -> Self {
        Self {
            reader,
            chunks: chunks.into_iter(),
            current: None,
            region,
            buf: Vec::new(),
            done: false,
            scanned: 0,
            matched: 0,
        }
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Records decoded so far, overlapping or not
    #[must_use]
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Records yielded so far
    #[must_use]
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Advances to the next overlapping record.
    ///
    /// The returned view borrows the scan's buffer and is invalidated by the
    /// next call. Any error ends the scan.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        match self.seek_next_match() {
            Ok(Some(offset)) => {
                self.matched += 1;
                Record::try_from_bytes(&self.buf)
                    .map(Some)
                    .map_err(|err| Error::record(offset, err))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    /// Reads records until one overlaps the region, leaving it in `buf`
    fn seek_next_match(&mut self) -> Result<Option<VirtualOffset>> {
        while let Some(offset) = self.read_next()? {
            self.scanned += 1;
            let record = Record::try_from_bytes(&self.buf).map_err(|err| Error::record(offset, err))?;
            if self.region.overlaps(&record) {
                return Ok(Some(offset));
            }
            if self.region.is_passed_by(&record) {
                self.done = true;
                break;
            }
        }
        Ok(None)
    }

    /// Reads the next raw record within the resolved chunks into `buf`,
    /// returning its virtual offset
    fn read_next(&mut self) -> Result<Option<VirtualOffset>> {
        loop {
            if self.done {
                return Ok(None);
            }
            if let Some(chunk) = self.current {
                let offset = self.reader.virtual_offset();
                if offset < chunk.end {
                    let mut size = [0u8; 4];
                    if !self.reader.read_exact_or_eof(&mut size)? {
                        self.current = None;
                        continue;
                    }
                    let block_size = i32::from_le_bytes(size);
                    let len = usize::try_from(block_size)
                        .ok()
                        .filter(|&len| len >= FIXED_SIZE)
                        .ok_or_else(|| {
                            Error::record(offset, RecordError::InvalidBlockSize(block_size))
                        })?;
                    self.reader.read_into(len, &mut self.buf)?;
                    return Ok(Some(offset));
                }
                self.current = None;
            }

            let Some(chunk) = self.chunks.next() else {
                self.done = true;
                return Ok(None);
            };
            // chunks are merged and ascending; never step back over records already read
            if self.reader.virtual_offset() < chunk.start {
                self.reader.seek(chunk.start)?;
            }
            self.current = Some(chunk);
        }
    }
}

/// Owned records overlapping a region, produced lazily by
/// [`Reader::query`](crate::Reader::query)
pub struct Query {
    records: RegionRecords<MappedBam>,
    header: Arc<Header>,
    finished: bool,
}
impl Query {
    pub(crate) fn new(records: RegionRecords<MappedBam>, header: Arc<Header>) -> Self {
        Self {
            records,
            header,
            finished: false,
        }
    }
}
impl Iterator for Query {
    type Item = Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.records.next_record() {
            Ok(Some(record)) => {
                let name = record
                    .reference_id()
                    .and_then(|id| self.header.reference_name(id));
                Some(Ok(record.to_alignment_record(name)))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{BamFixture, RecordSpec};

    fn fixture() -> BamFixture {
        BamFixture::new(&[("chr1", 100_000), ("chr2", 50_000)])
            .record(RecordSpec::mapped(0, 100, "a", &[(50, b'M')]))
            .record(RecordSpec::mapped(0, 500, "b", &[(100, b'M')]))
            .record(RecordSpec::mapped(0, 900, "c", &[(10, b'M')]))
            .record(RecordSpec::mapped(1, 10, "d", &[(10, b'M')]))
            .record(RecordSpec::unmapped("e"))
            .build()
    }

    fn scan(fixture: &BamFixture, reference_id: usize, start: u32, stop: u32) -> Vec<String> {
        let region = Region::new(reference_id, start, stop).unwrap();
        let chunks = fixture.index().resolve(reference_id, start, stop).unwrap();
        let reader = BgzfReader::new(fixture.bam_bytes(), true);
        let mut records = RegionRecords::new(reader, chunks, region);
        let mut names = Vec::new();
        while let Some(record) = records.next_record().unwrap() {
            names.push(record.name().to_string());
        }
        names
    }

    #[test]
    fn test_scan_region() {
        let fixture = fixture();
        assert_eq!(scan(&fixture, 0, 120, 600), ["a", "b"]);
        assert_eq!(scan(&fixture, 0, 0, 100_000), ["a", "b", "c"]);
        assert_eq!(scan(&fixture, 1, 0, 50_000), ["d"]);
        assert!(scan(&fixture, 0, 150, 500).is_empty());
    }

    #[test]
    fn test_stops_after_region() {
        let fixture = fixture();
        let region = Region::new(0, 0, 200).unwrap();
        let chunks = fixture.index().resolve(0, 0, 200).unwrap();
        let mut records =
            RegionRecords::new(BgzfReader::new(fixture.bam_bytes(), true), chunks, region);
        while records.next_record().unwrap().is_some() {}
        assert_eq!(records.matched(), 1);
        // "b" is read and found past the region, "c" never is
        assert_eq!(records.scanned(), 2);
    }

    #[test]
    fn test_invalid_block_size() {
        let fixture = BamFixture::new(&[("chr1", 1000)])
            .record(RecordSpec::mapped(0, 10, "ok", &[(5, b'M')]))
            .record(RecordSpec::mapped(0, 20, "bad", &[(5, b'M')]).with_block_size(8))
            .build();
        let region = Region::new(0, 0, 1000).unwrap();
        let chunks = fixture.index().resolve(0, 0, 1000).unwrap();
        let mut records =
            RegionRecords::new(BgzfReader::new(fixture.bam_bytes(), true), chunks, region);

        assert_eq!(records.next_record().unwrap().unwrap().name(), "ok");
        let err = records.next_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
        assert!(matches!(
            err,
            Error::RecordError {
                source: RecordError::InvalidBlockSize(8),
                ..
            }
        ));
        // the scan is over after an error
        assert!(records.next_record().unwrap().is_none());
    }
}
