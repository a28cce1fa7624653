use std::fmt;

/// Virtual file offset into a BGZF stream.
///
/// The upper 48 bits hold the compressed offset of a block's first byte, the
/// lower 16 bits hold the offset into that block's inflated data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualOffset(u64);

impl VirtualOffset {
    #[must_use]
    pub fn new(compressed: u64, uncompressed: u16) -> Self {
        Self((compressed << 16) | u64::from(uncompressed))
    }

    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Byte offset of the containing block in the compressed file
    #[must_use]
    pub fn compressed(self) -> u64 {
        self.0 >> 16
    }

    /// Byte offset within the inflated block
    #[must_use]
    pub fn uncompressed(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl From<u64> for VirtualOffset {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for VirtualOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.compressed(), self.uncompressed())
    }
}
