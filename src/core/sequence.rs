/// Nucleotide symbols indexed by their 4-bit BAM code
pub const BASES: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

/// Raw quality value marking scores as unavailable
pub const MISSING_QUALITY: u8 = 0xFF;

/// Highest Phred score with a printable Phred+33 symbol (`~`)
const MAX_PRINTABLE_SCORE: u8 = 93;

/// Packed 4-bit-per-base read sequence, high nibble first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sequence<'a> {
    packed: &'a [u8],
    len: usize,
}
impl<'a> Sequence<'a> {
    /// `packed` must hold at least `(len + 1) / 2` bytes
    #[must_use]
    pub fn new(packed: &'a [u8], len: usize) -> Self {
        Self {
            packed: &packed[..packed.len().min(len.div_ceil(2))],
            len,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed representation
    #[must_use]
    pub fn as_packed(&self) -> &'a [u8] {
        self.packed
    }

    /// Base symbol at position `i`
    #[must_use]
    pub fn get(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        let byte = *self.packed.get(i / 2)?;
        let code = if i % 2 == 0 { byte >> 4 } else { byte & 0xF };
        Some(BASES[code as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + 'a {
        self.packed
            .iter()
            .flat_map(|&byte| [BASES[(byte >> 4) as usize], BASES[(byte & 0xF) as usize]])
            .take(self.len)
    }

    /// Appends the decoded bases to `dst`; `*` for an absent sequence
    pub fn write_to(&self, dst: &mut String) {
        if self.is_empty() {
            dst.push('*');
            return;
        }
        dst.reserve(self.len);
        dst.extend(self.iter().map(char::from));
    }
}

/// Per-base Phred quality scores, present only when at least one score is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality<'a> {
    scores: &'a [u8],
}
impl<'a> Quality<'a> {
    /// Returns `None` for an empty payload or the all-`0xFF` unavailable marker
    #[must_use]
    pub fn new(scores: &'a [u8]) -> Option<Self> {
        if scores.is_empty() || scores.iter().all(|&q| q == MISSING_QUALITY) {
            None
        } else {
            Some(Self { scores })
        }
    }

    /// Raw Phred scores
    #[must_use]
    pub fn scores(&self) -> &'a [u8] {
        self.scores
    }

    /// Appends the Phred+33 text form to `dst`
    pub fn write_to(&self, dst: &mut String) {
        dst.reserve(self.scores.len());
        dst.extend(
            self.scores
                .iter()
                .map(|&q| char::from(q.min(MAX_PRINTABLE_SCORE) + 33)),
        );
    }
}
