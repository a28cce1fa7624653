use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use memchr::memchr;

use crate::bgzf::BgzfReader;
use crate::error::{HeaderError, Result};
use crate::BAM_MAGIC;

/// A reference sequence declared in the BAM header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub name: String,
    pub length: u32,
}

/// The binary BAM header: SAM header text and the reference dictionary.
///
/// ```text
/// magic   "BAM\1"
/// l_text  i32
/// text    u8 * l_text
/// n_ref   i32
/// per reference:
///   l_name  i32
///   name    u8 * l_name (NUL-terminated)
///   l_ref   i32
/// ```
#[derive(Debug, Clone, Default)]
pub struct Header {
    text: String,
    references: Vec<ReferenceSequence>,
    ids: HashMap<String, usize>,
}
impl Header {
    /// Reads the header from the start of the inflated stream, leaving the
    /// reader positioned at the first alignment record.
    pub fn read<S: AsRef<[u8]>>(reader: &mut BgzfReader<S>) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != *BAM_MAGIC {
            return Err(HeaderError::UnsupportedFormatVersion {
                format: "BAM",
                found: magic.to_vec(),
            }
            .into());
        }

        let mut buf = Vec::new();
        let l_text = read_length(reader, "text length")?;
        reader.read_into(l_text, &mut buf)?;
        // some writers pad the text with NULs
        let text_end = memchr(0, &buf).unwrap_or(buf.len());
        let text = String::from_utf8_lossy(&buf[..text_end]).into_owned();

        let n_ref = read_length(reader, "reference count")?;
        let mut references = Vec::with_capacity(n_ref.min(1 << 16));
        let mut ids = HashMap::with_capacity(n_ref.min(1 << 16));
        for id in 0..n_ref {
            let l_name = read_length(reader, "reference name length")?;
            reader.read_into(l_name, &mut buf)?;
            let name = memchr(0, &buf)
                .and_then(|end| std::str::from_utf8(&buf[..end]).ok())
                .ok_or(HeaderError::InvalidReferenceName(id))?
                .to_string();

            let mut l_ref = [0u8; 4];
            reader.read_exact(&mut l_ref)?;
            let l_ref = LittleEndian::read_i32(&l_ref);
            let length = u32::try_from(l_ref).map_err(|_| HeaderError::InvalidField {
                field: "reference length",
                value: l_ref,
            })?;

            ids.entry(name.clone()).or_insert(id);
            references.push(ReferenceSequence { name, length });
        }

        Ok(Self {
            text,
            references,
            ids,
        })
    }

    /// Builds a header directly from its parts
    #[must_use]
    pub fn new(text: String, references: Vec<ReferenceSequence>) -> Self {
        let mut ids = HashMap::with_capacity(references.len());
        for (id, reference) in references.iter().enumerate() {
            ids.entry(reference.name.clone()).or_insert(id);
        }
        Self {
            text,
            references,
            ids,
        }
    }

    /// The SAM header text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn references(&self) -> &[ReferenceSequence] {
        &self.references
    }

    #[must_use]
    pub fn reference(&self, id: usize) -> Option<&ReferenceSequence> {
        self.references.get(id)
    }

    #[must_use]
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.reference(id).map(|r| r.name.as_str())
    }

    /// Looks up a reference id by name
    #[must_use]
    pub fn reference_id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }
}

fn read_length<S: AsRef<[u8]>>(reader: &mut BgzfReader<S>, field: &'static str) -> Result<usize> {
    let mut raw = [0u8; 4];
    reader.read_exact(&mut raw)?;
    let value = LittleEndian::read_i32(&raw);
    Ok(usize::try_from(value).map_err(|_| HeaderError::InvalidField { field, value })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgzf::EOF_MARKER;
    use crate::error::ErrorKind;
    use crate::test_utils::{bgzf_block, header_bytes};

    fn reader_over(raw: &[u8]) -> BgzfReader<Vec<u8>> {
        let mut file = bgzf_block(raw);
        file.extend_from_slice(&EOF_MARKER);
        BgzfReader::new(file, true)
    }

    #[test]
    fn test_read_header() {
        let raw = header_bytes("@HD\tVN:1.6\n", &[("chr1", 248_956_422), ("chrM", 16_569)]);
        let mut reader = reader_over(&raw);
        let header = Header::read(&mut reader).unwrap();

        assert_eq!(header.text(), "@HD\tVN:1.6\n");
        assert_eq!(header.references().len(), 2);
        assert_eq!(header.reference_id("chrM"), Some(1));
        assert_eq!(header.reference_id("chr2"), None);
        assert_eq!(header.reference(0).unwrap().length, 248_956_422);
        assert_eq!(header.reference_name(1), Some("chrM"));

        // positioned at the end of the header
        let mut rest = [0u8; 1];
        assert!(!reader.read_exact_or_eof(&mut rest).unwrap());
    }

    #[test]
    fn test_bad_magic() {
        let mut raw = header_bytes("", &[("chr1", 10)]);
        raw[3] = 2;
        let err = Header::read(&mut reader_over(&raw)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormatVersion);
    }

    #[test]
    fn test_negative_length() {
        let mut raw = BAM_MAGIC.to_vec();
        raw.extend_from_slice(&(-5i32).to_le_bytes());
        let err = Header::read(&mut reader_over(&raw)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::HeaderError(HeaderError::InvalidField { value: -5, .. })
        ));
    }

    #[test]
    fn test_unterminated_reference_name() {
        let mut raw = BAM_MAGIC.to_vec();
        raw.extend_from_slice(&0i32.to_le_bytes());
        raw.extend_from_slice(&1i32.to_le_bytes());
        raw.extend_from_slice(&4i32.to_le_bytes());
        raw.extend_from_slice(b"chr1");
        raw.extend_from_slice(&10i32.to_le_bytes());
        let err = Header::read(&mut reader_over(&raw)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::HeaderError(HeaderError::InvalidReferenceName(0))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let raw = header_bytes("@HD\tVN:1.6\n", &[("chr1", 10)]);
        let err = Header::read(&mut reader_over(&raw[..raw.len() - 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    }
}
