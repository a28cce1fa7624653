//! Writers for small BGZF, BAM and BAI fixtures used across the test modules.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

use crate::bgzf::{VirtualOffset, EOF_MARKER};
use crate::core::BASES;
use crate::index::{Index, METADATA_BIN};
use crate::{BAI_MAGIC, BAM_MAGIC};

const CIGAR_SYMBOLS: &[u8] = b"MIDNSHP=X";

/// Compresses `data` into a single BGZF block
pub fn bgzf_block(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    let payload = encoder.finish().unwrap();

    let mut crc = Crc::new();
    crc.update(data);

    let bsize = 18 + payload.len() + 8;
    let mut block = vec![
        0x1f, 0x8b, 0x08, 0x04, 0, 0, 0, 0, 0, 0xff, 0x06, 0x00, b'B', b'C', 0x02, 0x00,
    ];
    block.extend_from_slice(&u16::try_from(bsize - 1).unwrap().to_le_bytes());
    block.extend_from_slice(&payload);
    block.extend_from_slice(&crc.sum().to_le_bytes());
    block.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
    block
}

/// Raw (uncompressed) BAM header bytes
pub fn header_bytes(text: &str, references: &[(&str, u32)]) -> Vec<u8> {
    let mut raw = BAM_MAGIC.to_vec();
    raw.extend_from_slice(&(text.len() as i32).to_le_bytes());
    raw.extend_from_slice(text.as_bytes());
    raw.extend_from_slice(&(references.len() as i32).to_le_bytes());
    for (name, length) in references {
        raw.extend_from_slice(&(name.len() as i32 + 1).to_le_bytes());
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        raw.extend_from_slice(&(*length as i32).to_le_bytes());
    }
    raw
}

/// Bin of the smallest UCSC bin containing `[beg, end)`
fn reg2bin(beg: i64, end: i64) -> u16 {
    let end = end - 1;
    let bin = if beg >> 14 == end >> 14 {
        4681 + (beg >> 14)
    } else if beg >> 17 == end >> 17 {
        585 + (beg >> 17)
    } else if beg >> 20 == end >> 20 {
        73 + (beg >> 20)
    } else if beg >> 23 == end >> 23 {
        9 + (beg >> 23)
    } else if beg >> 26 == end >> 26 {
        1 + (beg >> 26)
    } else {
        0
    };
    bin as u16
}

/// Description of one alignment record to encode
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub reference_id: i32,
    pub position: i32,
    pub name: String,
    pub cigar: Vec<(u32, u8)>,
    pub flags: u16,
    pub mapping_quality: u8,
    pub sequence: String,
    pub quality: Option<Vec<u8>>,
    pub aux: Vec<u8>,
    pub block_size: Option<i32>,
}
impl RecordSpec {
    pub fn mapped(reference_id: i32, position: i32, name: &str, cigar: &[(u32, u8)]) -> Self {
        Self {
            reference_id,
            position,
            name: name.to_string(),
            cigar: cigar.to_vec(),
            flags: 0,
            mapping_quality: 60,
            sequence: String::new(),
            quality: None,
            aux: Vec::new(),
            block_size: None,
        }
    }

    /// Unmapped and unplaced
    pub fn unmapped(name: &str) -> Self {
        Self {
            flags: 0x4,
            mapping_quality: 0,
            ..Self::mapped(-1, -1, name, &[])
        }
    }

    pub fn with_sequence(mut self, sequence: &str, quality: Option<&[u8]>) -> Self {
        self.sequence = sequence.to_string();
        self.quality = quality.map(<[u8]>::to_vec);
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_aux(mut self, aux: &[u8]) -> Self {
        self.aux.extend_from_slice(aux);
        self
    }

    /// Appends a `CG:B,I` tag holding `ops`
    pub fn with_cg_tag(mut self, ops: &[(u32, u8)]) -> Self {
        self.aux.extend_from_slice(b"CGBI");
        self.aux.extend_from_slice(&(ops.len() as u32).to_le_bytes());
        for &(len, symbol) in ops {
            self.aux.extend_from_slice(&pack_op(len, symbol).to_le_bytes());
        }
        self
    }

    /// Overrides the encoded `block_size` field
    pub fn with_block_size(mut self, block_size: i32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    pub fn is_placed(&self) -> bool {
        self.reference_id >= 0 && self.position >= 0
    }

    pub fn is_unmapped(&self) -> bool {
        self.flags & 0x4 != 0 || !self.is_placed()
    }

    /// `[start, end)` on the reference; at least one base wide
    pub fn span(&self) -> (i64, i64) {
        let len: i64 = self
            .cigar
            .iter()
            .filter(|(_, symbol)| b"MDN=X".contains(symbol))
            .map(|&(len, _)| i64::from(len))
            .sum();
        let start = i64::from(self.position);
        (start, start + len.max(1))
    }

    /// The record bytes including the leading `block_size`
    pub fn encode(&self) -> Vec<u8> {
        let l_seq = self.sequence.len();
        let bin = if self.position >= 0 {
            let (start, end) = self.span();
            reg2bin(start, end)
        } else {
            4680
        };

        let mut body = Vec::new();
        body.extend_from_slice(&self.reference_id.to_le_bytes());
        body.extend_from_slice(&self.position.to_le_bytes());
        body.push(u8::try_from(self.name.len() + 1).unwrap());
        body.push(self.mapping_quality);
        body.extend_from_slice(&bin.to_le_bytes());
        body.extend_from_slice(&(self.cigar.len() as u16).to_le_bytes());
        body.extend_from_slice(&self.flags.to_le_bytes());
        body.extend_from_slice(&(l_seq as i32).to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        body.extend_from_slice(&0i32.to_le_bytes());

        body.extend_from_slice(self.name.as_bytes());
        body.push(0);
        for &(len, symbol) in &self.cigar {
            body.extend_from_slice(&pack_op(len, symbol).to_le_bytes());
        }
        for pair in self.sequence.as_bytes().chunks(2) {
            let hi = base_code(pair[0]);
            let lo = pair.get(1).map_or(0, |&b| base_code(b));
            body.push(hi << 4 | lo);
        }
        match &self.quality {
            Some(quality) => {
                assert_eq!(quality.len(), l_seq);
                body.extend_from_slice(quality);
            }
            None => body.extend(std::iter::repeat(0xFF).take(l_seq)),
        }
        body.extend_from_slice(&self.aux);

        let block_size = self.block_size.unwrap_or(body.len() as i32);
        let mut bytes = block_size.to_le_bytes().to_vec();
        bytes.extend_from_slice(&body);
        bytes
    }
}

fn pack_op(len: u32, symbol: u8) -> u32 {
    let code = CIGAR_SYMBOLS.iter().position(|&s| s == symbol).unwrap();
    len << 4 | code as u32
}

fn base_code(base: u8) -> u8 {
    BASES
        .iter()
        .position(|&b| b == base.to_ascii_uppercase())
        .unwrap() as u8
}

/// A BAM file and its BAI index, both held in memory
pub struct BamFixture {
    references: Vec<(String, u32)>,
    records: Vec<RecordSpec>,
    /// Virtual offsets `[start, end)` of each record
    offsets: Vec<(VirtualOffset, VirtualOffset)>,
    bam: Vec<u8>,
    bai: Vec<u8>,
}

/// Where the inflated stream is cut into BGZF blocks
enum Blocking {
    /// The header alone, then every `n` whole records
    Records(usize),
    /// Every `n` bytes of the inflated stream, splitting records anywhere
    Bytes(usize),
}

pub struct FixtureBuilder {
    references: Vec<(String, u32)>,
    text: String,
    records: Vec<RecordSpec>,
    blocking: Blocking,
    eof_marker: bool,
}
impl FixtureBuilder {
    /// Records must be added in coordinate order
    pub fn record(mut self, record: RecordSpec) -> Self {
        self.records.push(record);
        self
    }

    /// Flush a BGZF block after every `n` records
    pub fn block_every(mut self, n: usize) -> Self {
        self.blocking = Blocking::Records(n.max(1));
        self
    }

    /// Cut the inflated stream every `n` bytes, so the header and records
    /// straddle block boundaries
    pub fn split_every(mut self, n: usize) -> Self {
        assert!((1..=usize::from(u16::MAX)).contains(&n));
        self.blocking = Blocking::Bytes(n);
        self
    }

    pub fn without_eof_marker(mut self) -> Self {
        self.eof_marker = false;
        self
    }

    pub fn build(self) -> BamFixture {
        let references: Vec<(&str, u32)> = self
            .references
            .iter()
            .map(|(name, len)| (name.as_str(), *len))
            .collect();

        let mut stream = header_bytes(&self.text, &references);
        let mut cuts = vec![stream.len()];
        let mut spans = Vec::with_capacity(self.records.len());
        for (i, record) in self.records.iter().enumerate() {
            let start = stream.len();
            stream.extend_from_slice(&record.encode());
            spans.push((start, stream.len()));
            if let Blocking::Records(n) = self.blocking {
                if (i + 1) % n == 0 {
                    cuts.push(stream.len());
                }
            }
        }
        if let Blocking::Bytes(n) = self.blocking {
            cuts = (n..stream.len()).step_by(n).collect();
        }
        cuts.push(stream.len());

        // (inflated start, compressed start) of each block
        let mut blocks: Vec<(usize, u64)> = Vec::new();
        let mut bam = Vec::new();
        let mut begin = 0;
        for end in cuts {
            if end <= begin {
                continue;
            }
            blocks.push((begin, bam.len() as u64));
            bam.extend_from_slice(&bgzf_block(&stream[begin..end]));
            begin = end;
        }
        let data_end = bam.len() as u64;
        let to_virtual = |position: usize| {
            if position == stream.len() {
                return VirtualOffset::new(data_end, 0);
            }
            let i = blocks.partition_point(|&(start, _)| start <= position) - 1;
            let (start, compressed) = blocks[i];
            VirtualOffset::new(compressed, (position - start) as u16)
        };
        let offsets: Vec<_> = spans
            .iter()
            .map(|&(start, end)| (to_virtual(start), to_virtual(end)))
            .collect();

        if self.eof_marker {
            bam.extend_from_slice(&EOF_MARKER);
        }

        let bai = build_index(self.references.len(), &self.records, &offsets);
        BamFixture {
            references: self.references,
            records: self.records,
            offsets,
            bam,
            bai,
        }
    }
}

#[derive(Default)]
struct ReferenceBuilder {
    bins: BTreeMap<u16, Vec<(VirtualOffset, VirtualOffset)>>,
    intervals: Vec<Option<VirtualOffset>>,
    span: Option<(VirtualOffset, VirtualOffset)>,
    mapped: u64,
    unmapped: u64,
}

fn build_index(
    n_ref: usize,
    records: &[RecordSpec],
    offsets: &[(VirtualOffset, VirtualOffset)],
) -> Vec<u8> {
    let mut references: Vec<ReferenceBuilder> = (0..n_ref).map(|_| ReferenceBuilder::default()).collect();
    let mut unplaced = 0u64;

    for (record, &(start, end)) in records.iter().zip(offsets) {
        if !record.is_placed() {
            unplaced += 1;
            continue;
        }
        let reference = &mut references[record.reference_id as usize];
        let (beg, stop) = record.span();

        let chunks = reference.bins.entry(reg2bin(beg, stop)).or_default();
        match chunks.last_mut() {
            Some(last) if last.1 == start => last.1 = end,
            _ => chunks.push((start, end)),
        }

        let first_window = (beg >> 14) as usize;
        let last_window = ((stop - 1) >> 14) as usize;
        if reference.intervals.len() <= last_window {
            reference.intervals.resize(last_window + 1, None);
        }
        for slot in &mut reference.intervals[first_window..=last_window] {
            if slot.map_or(true, |offset| start < offset) {
                *slot = Some(start);
            }
        }

        reference.span = Some(match reference.span {
            Some((first, _)) => (first, end),
            None => (start, end),
        });
        if record.flags & 0x4 != 0 {
            reference.unmapped += 1;
        } else {
            reference.mapped += 1;
        }
    }

    let mut bytes = BAI_MAGIC.to_vec();
    bytes.extend_from_slice(&(n_ref as i32).to_le_bytes());
    for reference in &references {
        let n_bin = reference.bins.len() + usize::from(reference.span.is_some());
        bytes.extend_from_slice(&(n_bin as i32).to_le_bytes());
        for (bin, chunks) in &reference.bins {
            bytes.extend_from_slice(&u32::from(*bin).to_le_bytes());
            bytes.extend_from_slice(&(chunks.len() as i32).to_le_bytes());
            for (start, end) in chunks {
                bytes.extend_from_slice(&start.as_raw().to_le_bytes());
                bytes.extend_from_slice(&end.as_raw().to_le_bytes());
            }
        }
        if let Some((first, last)) = reference.span {
            bytes.extend_from_slice(&METADATA_BIN.to_le_bytes());
            bytes.extend_from_slice(&2i32.to_le_bytes());
            for value in [first.as_raw(), last.as_raw(), reference.mapped, reference.unmapped] {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }

        // empty windows take the offset of the previous window
        bytes.extend_from_slice(&(reference.intervals.len() as i32).to_le_bytes());
        let mut previous = VirtualOffset::default();
        for slot in &reference.intervals {
            let offset = slot.unwrap_or(previous);
            bytes.extend_from_slice(&offset.as_raw().to_le_bytes());
            previous = offset;
        }
    }
    bytes.extend_from_slice(&unplaced.to_le_bytes());
    bytes
}

impl BamFixture {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(references: &[(&str, u32)]) -> FixtureBuilder {
        FixtureBuilder {
            references: references
                .iter()
                .map(|(name, len)| ((*name).to_string(), *len))
                .collect(),
            text: "@HD\tVN:1.6\tSO:coordinate\n".to_string(),
            records: Vec::new(),
            blocking: Blocking::Records(2),
            eof_marker: true,
        }
    }

    pub fn bam_bytes(&self) -> Vec<u8> {
        self.bam.clone()
    }

    pub fn bai_bytes(&self) -> Vec<u8> {
        self.bai.clone()
    }

    pub fn index(&self) -> Index {
        Index::from_bytes(&self.bai).unwrap()
    }

    /// Writes `<dir>/<name>` and `<dir>/<name>.bai`, returning the BAM path
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let bam = dir.join(name);
        fs::write(&bam, &self.bam).unwrap();
        fs::write(dir.join(format!("{name}.bai")), &self.bai).unwrap();
        bam
    }

    /// Names of the mapped records overlapping `chrom:[start, stop)`, in file order
    pub fn expected_names(&self, chrom: &str, start: u32, stop: u32) -> Vec<String> {
        let id = self
            .references
            .iter()
            .position(|(name, _)| name == chrom)
            .unwrap() as i32;
        self.records
            .iter()
            .filter(|r| r.reference_id == id && !r.is_unmapped())
            .filter(|r| {
                let (s, e) = r.span();
                s < i64::from(stop) && e > i64::from(start)
            })
            .map(|r| r.name.clone())
            .collect()
    }

    /// File offset just past the BGZF block holding the named record
    pub fn block_end_containing(&self, name: &str) -> usize {
        let i = self.records.iter().position(|r| r.name == name).unwrap();
        let block_start = self.offsets[i].0.compressed() as usize;
        let bsize = u16::from_le_bytes([self.bam[block_start + 16], self.bam[block_start + 17]]);
        block_start + usize::from(bsize) + 1
    }
}
