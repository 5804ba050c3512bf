use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};

use crate::parse::{read_fixed, DecodeError, EntryFault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn from_flag(flag: u32) -> Option<EntryKind> {
        match flag {
            0 => Some(EntryKind::File),
            1 => Some(EntryKind::Directory),
            _ => None,
        }
    }

    #[cfg(test)]
    fn flag(self) -> u32 {
        match self {
            EntryKind::File => 0,
            EntryKind::Directory => 1,
        }
    }
}

/// A directory or file node, decoded from the fixed-size record at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Where this record was decoded from. Entries are identified by this value.
    pub offset: u64,
    pub magic: [u8; 4],
    /// Offset of this entry's name in the name table, or 0 for no name.
    pub name_offset: u64,
    pub reserved1: [u8; 4],
    pub parent_offset: u64,
    pub kind: EntryKind,
    pub file_length: u64,
    pub modified_time: u64,
    pub created_time: u64,
    pub reserved2: [u8; 8],
    pub reserved3: [u8; 8],
    /// For a file, the start of its payload. For a directory, the first child record.
    pub start_offset: u64,
    /// For a file, the payload length. For a directory, the byte span of its child records.
    pub data_length: u32,
}

mod layout {
    use std::ops::Range;

    pub const MAGIC: Range<usize> = 0..4;
    pub const NAME: Range<usize> = 4..12;
    pub const RESERVED1: Range<usize> = 12..16;
    pub const PARENT: Range<usize> = 16..24;
    pub const IS_DIR: Range<usize> = 24..28;
    pub const FILE_LENGTH: Range<usize> = 28..36;
    pub const MODIFIED: Range<usize> = 36..44;
    pub const CREATED: Range<usize> = 44..52;
    pub const RESERVED2: Range<usize> = 52..60;
    pub const RESERVED3: Range<usize> = 60..68;
    pub const START: Range<usize> = 68..76;
    pub const DATA_LENGTH: Range<usize> = 76..80;
}

impl EntryRecord {
    pub const SIZE: usize = 80;

    pub fn parse(offset: u64, buf: &[u8; Self::SIZE]) -> Result<EntryRecord, DecodeError> {
        let flag = LittleEndian::read_u32(&buf[layout::IS_DIR]);
        let kind = EntryKind::from_flag(flag).ok_or(DecodeError::MalformedEntry {
            offset,
            fault: EntryFault::InvalidDirFlag(flag),
        })?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[layout::MAGIC]);
        let mut reserved1 = [0u8; 4];
        reserved1.copy_from_slice(&buf[layout::RESERVED1]);
        let mut reserved2 = [0u8; 8];
        reserved2.copy_from_slice(&buf[layout::RESERVED2]);
        let mut reserved3 = [0u8; 8];
        reserved3.copy_from_slice(&buf[layout::RESERVED3]);

        Ok(EntryRecord {
            offset,
            magic,
            name_offset: LittleEndian::read_u64(&buf[layout::NAME]),
            reserved1,
            parent_offset: LittleEndian::read_u64(&buf[layout::PARENT]),
            kind,
            file_length: LittleEndian::read_u64(&buf[layout::FILE_LENGTH]),
            modified_time: LittleEndian::read_u64(&buf[layout::MODIFIED]),
            created_time: LittleEndian::read_u64(&buf[layout::CREATED]),
            reserved2,
            reserved3,
            start_offset: LittleEndian::read_u64(&buf[layout::START]),
            data_length: LittleEndian::read_u32(&buf[layout::DATA_LENGTH]),
        })
    }

    pub(crate) fn read_at<R: Read + Seek>(
        reader: &mut R,
        offset: u64,
    ) -> Result<EntryRecord, DecodeError> {
        let buf = read_fixed::<_, { EntryRecord::SIZE }>(reader, offset)?.map_err(|available| {
            DecodeError::MalformedEntry {
                offset,
                fault: EntryFault::Truncated {
                    available,
                    expected: Self::SIZE,
                },
            }
        })?;
        let record = Self::parse(offset, &buf)?;

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            parent = format_args!("{:#x}", record.parent_offset),
            name = format_args!("{:#x}", record.name_offset),
            kind = ?record.kind,
            start = format_args!("{:#x}", record.start_offset),
            length = record.data_length,
            "deserialized EntryRecord"
        );

        Ok(record)
    }

    /// The root is the one entry that is its own parent.
    #[inline(always)]
    pub fn is_root(&self) -> bool {
        self.parent_offset == self.offset
    }

    #[inline(always)]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline(always)]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Offsets of the child records of a directory, in archive order.
    ///
    /// Empty for files. The range is not checked against the archive length.
    pub fn child_offsets(&self) -> impl Iterator<Item = u64> {
        let (start, end) = match self.kind {
            EntryKind::Directory => (
                self.start_offset,
                self.start_offset.saturating_add(u64::from(self.data_length)),
            ),
            EntryKind::File => (0, 0),
        };
        (start..end).step_by(Self::SIZE)
    }

    /// End of the payload for a file, or `None` if it overflows.
    #[inline(always)]
    pub fn payload_end(&self) -> Option<u64> {
        self.start_offset.checked_add(u64::from(self.data_length))
    }

    #[cfg(test)]
    pub(crate) fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[layout::MAGIC].copy_from_slice(&self.magic);
        LittleEndian::write_u64(&mut buf[layout::NAME], self.name_offset);
        buf[layout::RESERVED1].copy_from_slice(&self.reserved1);
        LittleEndian::write_u64(&mut buf[layout::PARENT], self.parent_offset);
        LittleEndian::write_u32(&mut buf[layout::IS_DIR], self.kind.flag());
        LittleEndian::write_u64(&mut buf[layout::FILE_LENGTH], self.file_length);
        LittleEndian::write_u64(&mut buf[layout::MODIFIED], self.modified_time);
        LittleEndian::write_u64(&mut buf[layout::CREATED], self.created_time);
        buf[layout::RESERVED2].copy_from_slice(&self.reserved2);
        buf[layout::RESERVED3].copy_from_slice(&self.reserved3);
        LittleEndian::write_u64(&mut buf[layout::START], self.start_offset);
        LittleEndian::write_u32(&mut buf[layout::DATA_LENGTH], self.data_length);
        buf
    }

    #[cfg(test)]
    pub(crate) fn test_entry(
        offset: u64,
        kind: EntryKind,
        name_offset: u64,
        parent_offset: u64,
        start_offset: u64,
        data_length: u32,
    ) -> EntryRecord {
        EntryRecord {
            offset,
            magic: *b"ENT\0",
            name_offset,
            reserved1: [0; 4],
            parent_offset,
            kind,
            file_length: u64::from(data_length),
            modified_time: 0,
            created_time: 0,
            reserved2: [0; 8],
            reserved3: [0; 8],
            start_offset,
            data_length,
        }
    }
}
