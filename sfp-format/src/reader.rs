use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use relative_path::RelativePathBuf;

use crate::header::SfpHeader;
use crate::names::NameTable;
use crate::parse::DecodeError;
use crate::path::{entry_path, PathError};
use crate::tree::EntrySet;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Invalid path to SFP file. Path: '{}'", .1.display())]
    InvalidPath(#[source] std::io::Error, PathBuf),

    #[error("Failed to read SFP file.")]
    ReadFailed(#[source] std::io::Error),

    #[error("Selected file is not a valid sfp. An error found in the file header.")]
    InvalidHeader(#[source] DecodeError),

    #[error("Selected file is not a valid sfp. An error found in the file header: declared size {declared} but the file has {actual} bytes.")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("Selected file is not a valid sfp. An error found in the file name table.")]
    InvalidNameTable(#[source] DecodeError),

    #[error("Selected file is not a valid sfp. An error found in the file name table: a name is stored at offset 0.")]
    NameTableCorrupt,

    #[error("Selected file is not a valid sfp. The root entry could not be read.")]
    InvalidRoot(#[source] DecodeError),
}

/// A validated SFP archive with its name table and entry tree decoded.
///
/// Payloads are not read until extraction.
pub struct SfpReader<R = BufReader<File>> {
    pub(crate) reader: R,
    pub(crate) path: Option<PathBuf>,
    pub(crate) header: SfpHeader,
    pub(crate) names: NameTable,
    pub(crate) entries: EntrySet,
    pub(crate) len: u64,
}

impl<R> std::fmt::Debug for SfpReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SfpReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("len", &self.len)
            .field("entries", &self.entries.len())
            .field("names", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl SfpReader<BufReader<File>> {
    /// Open an `.sfp` file and validate it. Nothing is written anywhere.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let path =
            std::fs::canonicalize(path).map_err(|e| OpenError::InvalidPath(e, path.to_path_buf()))?;
        let file = File::open(&path).map_err(OpenError::ReadFailed)?;

        let mut reader = Self::new(BufReader::new(file))?;
        reader.path = Some(path);
        Ok(reader)
    }
}

impl<R: Read + Seek> SfpReader<R> {
    /// Decode and validate an archive from any seekable stream.
    ///
    /// Fails if the header is short, the declared size differs from the stream length,
    /// the name table is out of range or holds a name at offset 0, or the root entry
    /// cannot be decoded.
    pub fn new(mut reader: R) -> Result<Self, OpenError> {
        let len = reader
            .seek(SeekFrom::End(0))
            .map_err(OpenError::ReadFailed)?;

        let header = SfpHeader::read_from(&mut reader).map_err(OpenError::InvalidHeader)?;
        if header.archive_size != len {
            return Err(OpenError::SizeMismatch {
                declared: header.archive_size,
                actual: len,
            });
        }

        let names =
            NameTable::read_from(&mut reader, &header, len).map_err(OpenError::InvalidNameTable)?;
        if names.contains(0) {
            return Err(OpenError::NameTableCorrupt);
        }

        let entries = EntrySet::build(&mut reader, header.first_entry_offset, len)
            .map_err(OpenError::InvalidRoot)?;

        Ok(SfpReader {
            reader,
            path: None,
            header,
            names,
            entries,
            len,
        })
    }
}

impl<R> SfpReader<R> {
    #[inline(always)]
    pub fn header(&self) -> &SfpHeader {
        &self.header
    }

    #[inline(always)]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    #[inline(always)]
    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    /// Length of the underlying stream, which equals the declared archive size.
    #[inline(always)]
    pub fn archive_len(&self) -> u64 {
        self.len
    }

    /// The canonical path of the archive, if it was opened from disk.
    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn entry_path(&self, offset: u64) -> Result<RelativePathBuf, PathError> {
        entry_path(&self.entries, &self.names, offset)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
