use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::header::SfpHeader;
use crate::parse::{read_at, DecodeError};

/// Null-terminated names, keyed by the absolute archive offset of their first byte.
#[derive(Debug, Default, Clone)]
pub struct NameTable(HashMap<u64, String>);

impl NameTable {
    /// Split `bytes`, which start at absolute offset `base`, into names.
    ///
    /// Empty runs are skipped, and bytes after the last terminator are not a name.
    pub fn parse(base: u64, bytes: &[u8]) -> NameTable {
        let mut names = HashMap::new();
        let mut run_start = 0usize;

        for (pos, byte) in bytes.iter().enumerate() {
            if *byte != 0 {
                continue;
            }
            if pos > run_start {
                names.insert(base + run_start as u64, decode_ascii(&bytes[run_start..pos]));
            }
            run_start = pos + 1;
        }

        NameTable(names)
    }

    pub(crate) fn read_from<R: Read + Seek>(
        reader: &mut R,
        header: &SfpHeader,
        archive_len: u64,
    ) -> Result<NameTable, DecodeError> {
        let start = header.name_table_offset;
        let end = header.data_offset;
        if end < start || end > archive_len {
            return Err(DecodeError::MalformedNameTable {
                start,
                end,
                archive_len,
            });
        }

        let bytes = read_at(reader, start, (end - start) as usize)?;
        if bytes.len() as u64 != end - start {
            return Err(DecodeError::MalformedNameTable {
                start,
                end,
                archive_len,
            });
        }

        let table = Self::parse(start, &bytes);
        tracing::debug!(
            start = format_args!("{:#x}", start),
            end = format_args!("{:#x}", end),
            bytes = end - start,
            count = table.len(),
            "deserialized NameTable"
        );

        Ok(table)
    }

    #[inline(always)]
    pub fn get(&self, offset: u64) -> Option<&str> {
        self.0.get(&offset).map(|s| s.as_str())
    }

    #[inline(always)]
    pub fn contains(&self, offset: u64) -> bool {
        self.0.contains_key(&offset)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

// Names are single-byte ASCII; anything above 0x7f has no mapping.
fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn names_are_keyed_by_absolute_offset() {
        let table = NameTable::parse(0x200, b"data\0a.txt\0\0sub\0");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0x200), Some("data"));
        assert_eq!(table.get(0x205), Some("a.txt"));
        assert_eq!(table.get(0x20c), Some("sub"));
        assert_eq!(table.get(0x20b), None);
    }

    #[test]
    fn leading_terminators_and_trailing_run_are_not_names() {
        let table = NameTable::parse(100, b"\0\0name\0tail");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(102), Some("name"));
        assert!(!table.contains(107));
    }

    #[test]
    fn non_ascii_bytes_are_replaced() {
        let table = NameTable::parse(10, b"caf\xe9\0");
        assert_eq!(table.get(10), Some("caf?"));
    }

    #[test]
    fn name_at_offset_zero_is_kept_for_validation() {
        let table = NameTable::parse(0, b"SFP\0x\0");
        assert!(table.contains(0));
    }

    fn header_with_range(start: u64, end: u64) -> SfpHeader {
        SfpHeader {
            magic: *b"SFP\0",
            version: 1,
            reserved1: [0; 8],
            first_entry_offset: 64,
            name_table_offset: start,
            data_offset: end,
            archive_size: 0,
            package_label_offset: 0,
            reserved2: [0; 8],
        }
    }

    #[test]
    fn inverted_range_is_malformed() {
        let mut cursor = Cursor::new(vec![0u8; 128]);
        let header = header_with_range(100, 90);
        assert!(matches!(
            NameTable::read_from(&mut cursor, &header, 128),
            Err(DecodeError::MalformedNameTable { start: 100, end: 90, .. })
        ));
    }

    #[test]
    fn range_past_archive_end_is_malformed() {
        let mut cursor = Cursor::new(vec![0u8; 128]);
        let header = header_with_range(100, 4096);
        assert!(matches!(
            NameTable::read_from(&mut cursor, &header, 128),
            Err(DecodeError::MalformedNameTable { .. })
        ));
    }

    #[test]
    fn reads_the_declared_range() {
        let mut bytes = vec![0xffu8; 8];
        bytes.extend_from_slice(b"one\0two\0");
        bytes.extend_from_slice(&[0xff; 4]);
        let len = bytes.len() as u64;
        let mut cursor = Cursor::new(bytes);

        let table = NameTable::read_from(&mut cursor, &header_with_range(8, 16), len).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(8), Some("one"));
        assert_eq!(table.get(12), Some("two"));
    }
}
