use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::RecordError;

/// CIGAR operation symbols, indexed by their BAM code
const SYMBOLS: &[u8; 9] = b"MIDNSHP=X";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Pad,
    SequenceMatch,
    SequenceMismatch,
}
impl Kind {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Match,
            1 => Self::Insertion,
            2 => Self::Deletion,
            3 => Self::Skip,
            4 => Self::SoftClip,
            5 => Self::HardClip,
            6 => Self::Pad,
            7 => Self::SequenceMatch,
            8 => Self::SequenceMismatch,
            _ => return None,
        })
    }

    /// The SAM letter for this operation
    #[must_use]
    pub fn symbol(self) -> u8 {
        SYMBOLS[self as usize]
    }

    /// Whether the operation advances along the reference (`M`, `D`, `N`, `=`, `X`)
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::Skip | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    /// Whether the operation advances along the read (`M`, `I`, `S`, `=`, `X`)
    #[must_use]
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

/// A single CIGAR operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Op {
    kind: Kind,
    len: u32,
}
impl Op {
    #[must_use]
    pub fn new(kind: Kind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Decodes a packed `len << 4 | op` value
    pub fn from_raw(raw: u32) -> Result<Self, RecordError> {
        let code = (raw & 0xF) as u8;
        let kind = Kind::from_code(code).ok_or(RecordError::InvalidCigarOp(code))?;
        Ok(Self::new(kind, raw >> 4))
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, char::from(self.kind.symbol()))
    }
}

/// A borrowed view over the packed CIGAR operations of a record.
///
/// Every operation code has been checked by [`Cigar::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cigar<'a> {
    raw: &'a [u8],
}
impl<'a> Cigar<'a> {
    /// Wraps packed little-endian `u32` operations, validating each code
    pub fn try_new(raw: &'a [u8]) -> Result<Self, RecordError> {
        if raw.len() % 4 != 0 {
            return Err(RecordError::SizeMismatch {
                required: raw.len().next_multiple_of(4),
                available: raw.len(),
            });
        }
        for chunk in raw.chunks_exact(4) {
            Op::from_raw(LittleEndian::read_u32(chunk))?;
        }
        Ok(Self { raw })
    }

    /// Number of operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len() / 4
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Op> + 'a {
        // codes were validated on construction
        self.raw
            .chunks_exact(4)
            .filter_map(|chunk| Op::from_raw(LittleEndian::read_u32(chunk)).ok())
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<Op> {
        let chunk = self.raw.get(i * 4..i * 4 + 4)?;
        Op::from_raw(LittleEndian::read_u32(chunk)).ok()
    }

    /// Number of reference bases covered by the alignment
    #[must_use]
    pub fn reference_len(&self) -> u32 {
        self.iter()
            .filter(|op| op.kind().consumes_reference())
            .fold(0u32, |acc, op| acc.saturating_add(op.len()))
    }

    /// Number of read bases described by the alignment
    #[must_use]
    pub fn read_len(&self) -> u32 {
        self.iter()
            .filter(|op| op.kind().consumes_read())
            .fold(0u32, |acc, op| acc.saturating_add(op.len()))
    }

    /// Appends the SAM text form to `dst`; `*` when there are no operations
    pub fn write_to(&self, dst: &mut String) {
        if self.is_empty() {
            dst.push('*');
            return;
        }
        let mut buffer = itoa::Buffer::new();
        for op in self.iter() {
            dst.push_str(buffer.format(op.len()));
            dst.push(char::from(op.kind().symbol()));
        }
    }
}
impl fmt::Display for Cigar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::with_capacity(self.len() * 4);
        self.write_to(&mut text);
        f.write_str(&text)
    }
}
