use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};

use crate::parse::{read_fixed, DecodeError};

/// The fixed-size header found at offset 0 of every SFP archive.
///
/// All offsets are absolute byte positions within the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfpHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub reserved1: [u8; 8],
    pub first_entry_offset: u64,
    pub name_table_offset: u64,
    /// End of the name table and start of the payload data region.
    pub data_offset: u64,
    /// Declared total size of the archive. Must match the real stream length.
    pub archive_size: u64,
    pub package_label_offset: u64,
    pub reserved2: [u8; 8],
}

mod layout {
    use std::ops::Range;

    pub const MAGIC: Range<usize> = 0..4;
    pub const VERSION: Range<usize> = 4..8;
    pub const RESERVED1: Range<usize> = 8..16;
    pub const FIRST_ENTRY: Range<usize> = 16..24;
    pub const NAME_TABLE: Range<usize> = 24..32;
    pub const DATA: Range<usize> = 32..40;
    pub const ARCHIVE_SIZE: Range<usize> = 40..48;
    pub const PACKAGE_LABEL: Range<usize> = 48..56;
    pub const RESERVED2: Range<usize> = 56..64;
}

impl SfpHeader {
    pub const SIZE: usize = 64;

    pub fn parse(buf: &[u8; Self::SIZE]) -> SfpHeader {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[layout::MAGIC]);
        let mut reserved1 = [0u8; 8];
        reserved1.copy_from_slice(&buf[layout::RESERVED1]);
        let mut reserved2 = [0u8; 8];
        reserved2.copy_from_slice(&buf[layout::RESERVED2]);

        SfpHeader {
            magic,
            version: LittleEndian::read_u32(&buf[layout::VERSION]),
            reserved1,
            first_entry_offset: LittleEndian::read_u64(&buf[layout::FIRST_ENTRY]),
            name_table_offset: LittleEndian::read_u64(&buf[layout::NAME_TABLE]),
            data_offset: LittleEndian::read_u64(&buf[layout::DATA]),
            archive_size: LittleEndian::read_u64(&buf[layout::ARCHIVE_SIZE]),
            package_label_offset: LittleEndian::read_u64(&buf[layout::PACKAGE_LABEL]),
            reserved2,
        }
    }

    pub(crate) fn read_from<R: Read + Seek>(reader: &mut R) -> Result<SfpHeader, DecodeError> {
        let buf = read_fixed::<_, { SfpHeader::SIZE }>(reader, 0)?.map_err(|available| {
            DecodeError::MalformedHeader {
                available,
                expected: Self::SIZE,
            }
        })?;
        let header = Self::parse(&buf);

        tracing::debug!(
            version = header.version,
            first_entry = format_args!("{:#x}", header.first_entry_offset),
            name_table = format_args!("{:#x}", header.name_table_offset),
            data = format_args!("{:#x}", header.data_offset),
            archive_size = header.archive_size,
            "deserialized SfpHeader"
        );

        Ok(header)
    }

    #[cfg(test)]
    pub(crate) fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[layout::MAGIC].copy_from_slice(&self.magic);
        LittleEndian::write_u32(&mut buf[layout::VERSION], self.version);
        buf[layout::RESERVED1].copy_from_slice(&self.reserved1);
        LittleEndian::write_u64(&mut buf[layout::FIRST_ENTRY], self.first_entry_offset);
        LittleEndian::write_u64(&mut buf[layout::NAME_TABLE], self.name_table_offset);
        LittleEndian::write_u64(&mut buf[layout::DATA], self.data_offset);
        LittleEndian::write_u64(&mut buf[layout::ARCHIVE_SIZE], self.archive_size);
        LittleEndian::write_u64(&mut buf[layout::PACKAGE_LABEL], self.package_label_offset);
        buf[layout::RESERVED2].copy_from_slice(&self.reserved2);
        buf
    }
}
