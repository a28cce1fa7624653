use byteorder::{ByteOrder, LittleEndian};
use memchr::memchr;

use crate::error::RecordError;

use super::cigar::{Cigar, Kind, Op};
use super::sequence::{Quality, Sequence};

/// Size of the fixed part of a record, after `block_size`
pub const FIXED_SIZE: usize = 32;

/// Template has multiple segments
pub const FLAG_PAIRED: u16 = 0x1;
/// Segment is unmapped
pub const FLAG_UNMAPPED: u16 = 0x4;
/// Sequence is reverse complemented
pub const FLAG_REVERSE: u16 = 0x10;
/// Secondary alignment
pub const FLAG_SECONDARY: u16 = 0x100;
/// Supplementary alignment
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Flags(u16);
impl Flags {
    #[must_use]
    pub fn new(bits: u16) -> Self {
        Self(bits)
    }
    #[must_use]
    pub fn bits(self) -> u16 {
        self.0
    }
    #[must_use]
    pub fn is_paired(self) -> bool {
        self.0 & FLAG_PAIRED != 0
    }
    #[must_use]
    pub fn is_unmapped(self) -> bool {
        self.0 & FLAG_UNMAPPED != 0
    }
    #[must_use]
    pub fn is_reverse_complemented(self) -> bool {
        self.0 & FLAG_REVERSE != 0
    }
    #[must_use]
    pub fn is_secondary(self) -> bool {
        self.0 & FLAG_SECONDARY != 0
    }
    #[must_use]
    pub fn is_supplementary(self) -> bool {
        self.0 & FLAG_SUPPLEMENTARY != 0
    }
}

/// A zero-copy view over one decoded BAM alignment record.
///
/// ```text
/// refID      i32        bin_mq_nl  (bin u16, mapq u8, l_read_name u8)
/// pos        i32        flag_nc    (flag u16, n_cigar_op u16)
/// l_seq      i32        next_refID i32
/// next_pos   i32        tlen       i32
/// read_name  u8 * l_read_name      (NUL-terminated)
/// cigar      u32 * n_cigar_op      (len << 4 | op)
/// seq        u8 * (l_seq + 1) / 2  (4 bits per base)
/// qual       u8 * l_seq
/// aux        remainder
/// ```
///
/// All lengths are validated against the record bounds on construction, so
/// accessors never fail.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    reference_id: i32,
    position: i32,
    mapping_quality: u8,
    bin: u16,
    flags: Flags,
    next_reference_id: i32,
    next_position: i32,
    template_length: i32,
    name: &'a str,
    cigar: Cigar<'a>,
    sequence: Sequence<'a>,
    quality: &'a [u8],
    aux: &'a [u8],
}
impl<'a> Record<'a> {
    /// Decodes a record from the bytes following its `block_size` field
    pub fn try_from_bytes(buf: &'a [u8]) -> Result<Self, RecordError> {
        if buf.len() < FIXED_SIZE {
            return Err(RecordError::InvalidBlockSize(
                i32::try_from(buf.len()).unwrap_or(i32::MAX),
            ));
        }
        let reference_id = LittleEndian::read_i32(&buf[0..4]);
        let position = LittleEndian::read_i32(&buf[4..8]);
        let l_read_name = buf[8] as usize;
        let mapping_quality = buf[9];
        let bin = LittleEndian::read_u16(&buf[10..12]);
        let n_cigar_op = LittleEndian::read_u16(&buf[12..14]) as usize;
        let flags = Flags::new(LittleEndian::read_u16(&buf[14..16]));
        let l_seq = LittleEndian::read_i32(&buf[16..20]);
        let next_reference_id = LittleEndian::read_i32(&buf[20..24]);
        let next_position = LittleEndian::read_i32(&buf[24..28]);
        let template_length = LittleEndian::read_i32(&buf[28..32]);

        let seq_len = usize::try_from(l_seq).map_err(|_| RecordError::InvalidSequenceLength(l_seq))?;
        if l_read_name == 0 {
            return Err(RecordError::InvalidName);
        }

        let name_end = FIXED_SIZE + l_read_name;
        let cigar_end = name_end + n_cigar_op * 4;
        let seq_end = cigar_end + seq_len.div_ceil(2);
        let qual_end = seq_end + seq_len;
        if qual_end > buf.len() {
            return Err(RecordError::SizeMismatch {
                required: qual_end,
                available: buf.len(),
            });
        }

        let raw_name = &buf[FIXED_SIZE..name_end];
        let name = memchr(0, raw_name)
            .and_then(|end| std::str::from_utf8(&raw_name[..end]).ok())
            .ok_or(RecordError::InvalidName)?;

        let aux = &buf[qual_end..];
        let mut cigar = Cigar::try_new(&buf[name_end..cigar_end])?;
        if stores_cigar_in_tag(&cigar, seq_len) {
            if let Some(raw) = find_cigar_tag(aux)? {
                cigar = Cigar::try_new(raw)?;
            }
        }

        Ok(Self {
            reference_id,
            position,
            mapping_quality,
            bin,
            flags,
            next_reference_id,
            next_position,
            template_length,
            name,
            cigar,
            sequence: Sequence::new(&buf[cigar_end..seq_end], seq_len),
            quality: &buf[seq_end..qual_end],
            aux,
        })
    }

    /// Reference id, `None` for unplaced records
    #[must_use]
    pub fn reference_id(&self) -> Option<usize> {
        usize::try_from(self.reference_id).ok()
    }

    /// 0-based leftmost position, `None` when unset
    #[must_use]
    pub fn position(&self) -> Option<i32> {
        (self.position >= 0).then_some(self.position)
    }

    /// Mapping quality, `None` when unavailable (255)
    #[must_use]
    pub fn mapping_quality(&self) -> Option<u8> {
        (self.mapping_quality != 255).then_some(self.mapping_quality)
    }

    /// Bin stored in the record
    #[must_use]
    pub fn bin(&self) -> u16 {
        self.bin
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Unmapped flag set, or no reference assigned
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.flags.is_unmapped() || self.reference_id().is_none() || self.position().is_none()
    }

    #[must_use]
    pub fn next_reference_id(&self) -> Option<usize> {
        usize::try_from(self.next_reference_id).ok()
    }

    #[must_use]
    pub fn next_position(&self) -> Option<i32> {
        (self.next_position >= 0).then_some(self.next_position)
    }

    #[must_use]
    pub fn template_length(&self) -> i32 {
        self.template_length
    }

    /// Read name without its NUL terminator
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// CIGAR operations, recovered from the `CG` tag where applicable
    #[must_use]
    pub fn cigar(&self) -> Cigar<'a> {
        self.cigar
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence<'a> {
        self.sequence
    }

    /// Quality scores, `None` when unavailable
    #[must_use]
    pub fn quality(&self) -> Option<Quality<'a>> {
        Quality::new(self.quality)
    }

    /// Raw auxiliary tag data
    #[must_use]
    pub fn aux(&self) -> &'a [u8] {
        self.aux
    }

    /// Number of reference bases covered by the alignment
    #[must_use]
    pub fn reference_len(&self) -> u32 {
        self.cigar.reference_len()
    }

    /// Exclusive end on the reference, `None` when the alignment covers no
    /// reference bases.
    ///
    /// Region queries treat such a record as one base wide at its start, so
    /// rows with a null `end` still appear in fetched batches.
    #[must_use]
    pub fn end(&self) -> Option<i32> {
        let start = self.position()?;
        let len = self.reference_len();
        if len == 0 {
            return None;
        }
        let end = i64::from(start) + i64::from(len);
        Some(i32::try_from(end).unwrap_or(i32::MAX))
    }

    /// Copies the record into an owned [`AlignmentRecord`]
    #[must_use]
    pub fn to_alignment_record(&self, reference_name: Option<&str>) -> AlignmentRecord {
        let mut sequence = String::with_capacity(self.sequence.len());
        self.sequence.write_to(&mut sequence);
        AlignmentRecord {
            reference_name: reference_name.map(str::to_string),
            start: self.position(),
            end: self.end(),
            name: self.name.to_string(),
            flags: self.flags,
            mapping_quality: self.mapping_quality(),
            cigar: self.cigar.iter().collect(),
            raw_sequence: self.sequence.as_packed().to_vec(),
            sequence,
            quality: self.quality().map(|q| q.scores().to_vec()),
        }
    }
}

/// An owned, fully decoded alignment record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub reference_name: Option<String>,
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub name: String,
    pub flags: Flags,
    pub mapping_quality: Option<u8>,
    pub cigar: Vec<Op>,
    /// Packed 4-bit bases as stored
    pub raw_sequence: Vec<u8>,
    /// Decoded bases, `*` when absent
    pub sequence: String,
    /// Raw Phred scores
    pub quality: Option<Vec<u8>>,
}
impl AlignmentRecord {
    /// SAM text form of the CIGAR
    #[must_use]
    pub fn cigar_string(&self) -> String {
        if self.cigar.is_empty() {
            return "*".to_string();
        }
        self.cigar.iter().map(ToString::to_string).collect()
    }

    /// Phred+33 text form of the quality scores
    #[must_use]
    pub fn quality_string(&self) -> Option<String> {
        let scores = self.quality.as_deref()?;
        let mut text = String::with_capacity(scores.len());
        Quality::new(scores)?.write_to(&mut text);
        Some(text)
    }
}

/// A record whose CIGAR is exactly `kSmN` with `k == l_seq` keeps its real
/// CIGAR in the `CG:B,I` tag
fn stores_cigar_in_tag(cigar: &Cigar<'_>, seq_len: usize) -> bool {
    if cigar.len() != 2 {
        return false;
    }
    match (cigar.get(0), cigar.get(1)) {
        (Some(clip), Some(skip)) => {
            clip.kind() == Kind::SoftClip
                && clip.len() as usize == seq_len
                && skip.kind() == Kind::Skip
        }
        _ => false,
    }
}

/// Scans auxiliary data for a `CG:B,I` array and returns its raw payload
fn find_cigar_tag(mut data: &[u8]) -> Result<Option<&[u8]>, RecordError> {
    while data.len() >= 3 {
        let tag = [data[0], data[1]];
        let ty = data[2];
        data = &data[3..];

        let size = match ty {
            b'A' | b'c' | b'C' => 1,
            b's' | b'S' => 2,
            b'i' | b'I' | b'f' => 4,
            b'Z' | b'H' => memchr(0, data).ok_or(RecordError::InvalidAuxField("unterminated string"))? + 1,
            b'B' => {
                if data.len() < 5 {
                    return Err(RecordError::InvalidAuxField("truncated array"));
                }
                let subtype = data[0];
                let count = LittleEndian::read_u32(&data[1..5]) as usize;
                let width = match subtype {
                    b'c' | b'C' => 1,
                    b's' | b'S' => 2,
                    b'i' | b'I' | b'f' => 4,
                    _ => return Err(RecordError::InvalidAuxField("unknown array subtype")),
                };
                let payload = count
                    .checked_mul(width)
                    .filter(|&n| n <= data.len() - 5)
                    .ok_or(RecordError::InvalidAuxField("truncated array"))?;
                if &tag == b"CG" && subtype == b'I' {
                    return Ok(Some(&data[5..5 + payload]));
                }
                5 + payload
            }
            _ => return Err(RecordError::InvalidAuxField("unknown type")),
        };
        if size > data.len() {
            return Err(RecordError::InvalidAuxField("truncated value"));
        }
        data = &data[size..];
    }
    Ok(None)
}
