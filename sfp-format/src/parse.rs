//! Bounded reads and the error type shared by the fixed-layout decoders.
//!
//! Every structure in an SFP archive is addressed by an absolute byte offset, so the
//! decoders here always seek first and then read a fixed number of bytes. A short read
//! is a format error, not an I/O error.

use std::io::{Read, Seek, SeekFrom};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Header is truncated: {available} of {expected} bytes available.")]
    MalformedHeader { available: usize, expected: usize },

    #[error("Entry at offset {offset:#x} is malformed: {fault}")]
    MalformedEntry { offset: u64, fault: EntryFault },

    #[error("Name table range {start:#x}..{end:#x} is invalid for an archive of {archive_len} bytes.")]
    MalformedNameTable {
        start: u64,
        end: u64,
        archive_len: u64,
    },

    #[error("Reading archive failed.")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EntryFault {
    #[error("only {available} of {expected} bytes available")]
    Truncated { available: usize, expected: usize },

    #[error("invalid directory flag {0}")]
    InvalidDirFlag(u32),
}

/// Seek to `offset` and read up to `len` bytes. Returns fewer bytes only when the stream ends.
pub(crate) fn read_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    len: usize,
) -> std::io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(len);
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read exactly `N` bytes at `offset`, or report how many were available.
pub(crate) fn read_fixed<R: Read + Seek, const N: usize>(
    reader: &mut R,
    offset: u64,
) -> std::io::Result<Result<[u8; N], usize>> {
    let buf = read_at(reader, offset, N)?;
    if buf.len() < N {
        return Ok(Err(buf.len()));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&buf);
    Ok(Ok(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_fixed_reports_available_bytes() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let full = read_fixed::<_, 4>(&mut cursor, 1).unwrap();
        assert_eq!(full, Ok([2, 3, 4, 5]));

        let short = read_fixed::<_, 4>(&mut cursor, 3).unwrap();
        assert_eq!(short, Err(2));

        let past_end = read_fixed::<_, 4>(&mut cursor, 100).unwrap();
        assert_eq!(past_end, Err(0));
    }
}
