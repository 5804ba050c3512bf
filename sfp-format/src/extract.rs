use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use memmap2::Mmap;
use rayon::prelude::*;

use crate::path::{entry_path, PathError};
use crate::reader::SfpReader;
use crate::record::{EntryKind, EntryRecord};
use crate::tree::EntrySet;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Creating directory failed. Path: '{}'", .1.display())]
    CreateDirFailed(#[source] std::io::Error, PathBuf),

    #[error("Creating file failed. Path: '{}'", .1.display())]
    CreateFileFailed(#[source] std::io::Error, PathBuf),

    #[error("Reading payload failed. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),

    #[error("Writing file failed. Path: '{}'", .1.display())]
    WriteFailed(#[source] std::io::Error, PathBuf),

    #[error("Payload at {start:#x} with length {length} lies outside the archive. Path: '{}'", .path.display())]
    PayloadOutOfBounds {
        path: PathBuf,
        start: u64,
        length: u32,
    },

    #[error("Resolving entry path failed.")]
    Path(#[from] PathError),

    #[error("Memory-mapping the archive failed.")]
    MapFailed(#[source] std::io::Error),

    #[error("Starting extraction workers failed.")]
    ThreadPool(#[source] rayon::ThreadPoolBuildError),
}

/// Options for extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Replace files that already exist at the destination.
    pub overwrite: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions { overwrite: true }
    }
}

/// Statistics from extracting an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Number of files written.
    pub files_extracted: u64,
    /// Number of directory entries processed, whether or not they already existed.
    pub directories: u64,
    /// Number of files left alone because they already existed.
    pub files_skipped: u64,
    /// Number of entries that could not be decoded, resolved or written.
    pub entries_failed: u64,
    /// Total payload bytes written to disk.
    pub bytes_written: u64,
}

impl AddAssign for ExtractStats {
    fn add_assign(&mut self, other: Self) {
        self.files_extracted += other.files_extracted;
        self.directories += other.directories;
        self.files_skipped += other.files_skipped;
        self.entries_failed += other.entries_failed;
        self.bytes_written += other.bytes_written;
    }
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file{} extracted into {} folder{}.",
            self.files_extracted,
            plural(self.files_extracted),
            self.directories,
            plural(self.directories)
        )
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Per-entry progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractProgress {
    Directory {
        path: PathBuf,
    },
    File {
        path: PathBuf,
        bytes: u32,
    },
    /// The file already existed and was kept.
    Skipped {
        path: PathBuf,
        bytes: u32,
    },
    /// `path` is `None` when the entry failed before its path was known.
    Failed {
        offset: u64,
        path: Option<PathBuf>,
        message: String,
    },
}

enum Outcome {
    Directory,
    File(u64),
    Skipped,
}

impl<R: Read + Seek> SfpReader<R> {
    /// Extract every entry below `dest`, one at a time, streaming payloads from the archive.
    ///
    /// Failures are per entry: they are logged, reported as [`ExtractProgress::Failed`]
    /// and counted, and extraction continues with the next entry.
    pub fn extract_all<P: AsRef<Path>>(
        &mut self,
        dest: P,
        options: &ExtractOptions,
        progress: Option<Sender<ExtractProgress>>,
    ) -> ExtractStats {
        let dest = dest.as_ref();
        let progress = progress.as_ref();
        let mut stats = ExtractStats::default();
        report_faults(&self.entries, &mut stats, progress);

        for record in self.entries.iter() {
            let path = match entry_path(&self.entries, &self.names, record.offset) {
                Ok(rel) => rel.to_path(dest),
                Err(e) => {
                    finish_entry(&mut stats, progress, record, None, Err(e.into()));
                    continue;
                }
            };

            let result = match record.kind {
                EntryKind::Directory => create_dir(&path),
                EntryKind::File => {
                    extract_streamed(&mut self.reader, self.len, record, &path, options)
                }
            };
            finish_entry(&mut stats, progress, record, Some(path), result);
        }

        log_finished(dest, &stats);
        stats
    }
}

impl SfpReader<BufReader<File>> {
    /// Extract every entry below `dest` using `jobs` worker threads.
    ///
    /// Directories are created first, in tree order. File payloads are then copied by
    /// the workers out of a read-only memory map of the archive, so no worker touches
    /// the reader's stream position.
    pub fn extract_all_parallel<P: AsRef<Path>>(
        &self,
        dest: P,
        options: &ExtractOptions,
        jobs: usize,
        progress: Option<Sender<ExtractProgress>>,
    ) -> Result<ExtractStats, ExtractError> {
        let dest = dest.as_ref();
        let progress = progress.as_ref();

        // SAFETY: the map is read-only and dropped before this call returns. The archive
        // must not be truncated by another process while extraction runs.
        let map = unsafe { Mmap::map(self.reader.get_ref()) }.map_err(ExtractError::MapFailed)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(ExtractError::ThreadPool)?;

        let mut stats = ExtractStats::default();
        report_faults(&self.entries, &mut stats, progress);

        // Entries resolving to the same destination share a group and are written in
        // discovery order by one worker, as the sequential pass would.
        let mut groups: Vec<Vec<(&EntryRecord, PathBuf)>> = Vec::new();
        let mut group_of: HashMap<PathBuf, usize> = HashMap::new();
        for record in self.entries.iter() {
            let path = match self.entry_path(record.offset) {
                Ok(rel) => rel.to_path(dest),
                Err(e) => {
                    finish_entry(&mut stats, progress, record, None, Err(e.into()));
                    continue;
                }
            };

            match record.kind {
                EntryKind::Directory => {
                    let result = create_dir(&path);
                    finish_entry(&mut stats, progress, record, Some(path), result);
                }
                EntryKind::File => match group_of.get(&path) {
                    Some(&index) => groups[index].push((record, path)),
                    None => {
                        group_of.insert(path.clone(), groups.len());
                        groups.push(vec![(record, path)]);
                    }
                },
            }
        }

        tracing::debug!(paths = groups.len(), jobs, "extracting files in parallel");

        let file_stats = pool.install(|| {
            groups
                .into_par_iter()
                .map(|group| {
                    let mut stats = ExtractStats::default();
                    for (record, path) in group {
                        let result = extract_mapped(&map, record, &path, options);
                        finish_entry(&mut stats, progress, record, Some(path), result);
                    }
                    stats
                })
                .reduce(ExtractStats::default, |mut a, b| {
                    a += b;
                    a
                })
        });
        stats += file_stats;

        log_finished(dest, &stats);
        Ok(stats)
    }
}

fn report_faults(
    entries: &EntrySet,
    stats: &mut ExtractStats,
    progress: Option<&Sender<ExtractProgress>>,
) {
    for fault in entries.faults() {
        stats.entries_failed += 1;
        send(
            progress,
            ExtractProgress::Failed {
                offset: fault.offset,
                path: None,
                message: describe(&fault.error),
            },
        );
    }
}

fn finish_entry(
    stats: &mut ExtractStats,
    progress: Option<&Sender<ExtractProgress>>,
    record: &EntryRecord,
    path: Option<PathBuf>,
    result: Result<Outcome, ExtractError>,
) {
    let event = match (result, path) {
        (Ok(Outcome::Directory), Some(path)) => {
            stats.directories += 1;
            ExtractProgress::Directory { path }
        }
        (Ok(Outcome::File(bytes)), Some(path)) => {
            stats.files_extracted += 1;
            stats.bytes_written += bytes;
            ExtractProgress::File {
                path,
                bytes: record.data_length,
            }
        }
        (Ok(Outcome::Skipped), Some(path)) => {
            stats.files_skipped += 1;
            ExtractProgress::Skipped {
                path,
                bytes: record.data_length,
            }
        }
        (Ok(_), None) => return,
        (Err(error), path) => {
            stats.entries_failed += 1;
            let message = describe(&error);
            match &path {
                Some(path) => {
                    tracing::warn!(path = %path.display(), %message, "could not extract entry")
                }
                None => tracing::warn!(
                    offset = format_args!("{:#x}", record.offset),
                    %message,
                    "could not resolve entry path"
                ),
            }
            ExtractProgress::Failed {
                offset: record.offset,
                path,
                message,
            }
        }
    };
    send(progress, event);
}

#[inline(always)]
fn send(progress: Option<&Sender<ExtractProgress>>, event: ExtractProgress) {
    if let Some(tx) = progress {
        // The receiver going away only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn log_finished(dest: &Path, stats: &ExtractStats) {
    tracing::info!(
        dest = %dest.display(),
        files = stats.files_extracted,
        directories = stats.directories,
        skipped = stats.files_skipped,
        failed = stats.entries_failed,
        bytes = stats.bytes_written,
        "extraction finished"
    );
}

/// The error and all of its sources on one line.
fn describe(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}

fn create_dir(path: &Path) -> Result<Outcome, ExtractError> {
    fs::create_dir_all(path).map_err(|e| ExtractError::CreateDirFailed(e, path.to_path_buf()))?;
    Ok(Outcome::Directory)
}

/// Apply the overwrite policy. Returns `false` if an existing file has to stay.
fn make_room(path: &Path, overwrite: bool) -> bool {
    if overwrite && path.exists() {
        if let Err(error) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %error, "could not remove existing file");
        }
    }
    !path.exists()
}

fn payload_range(
    record: &EntryRecord,
    archive_len: u64,
    path: &Path,
) -> Result<(u64, u64), ExtractError> {
    match record.payload_end() {
        Some(end) if end <= archive_len => Ok((record.start_offset, end)),
        _ => Err(ExtractError::PayloadOutOfBounds {
            path: path.to_path_buf(),
            start: record.start_offset,
            length: record.data_length,
        }),
    }
}

fn create_new(path: &Path) -> Result<File, ExtractError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| ExtractError::CreateFileFailed(e, path.to_path_buf()))
}

fn extract_streamed<R: Read + Seek>(
    reader: &mut R,
    archive_len: u64,
    record: &EntryRecord,
    path: &Path,
    options: &ExtractOptions,
) -> Result<Outcome, ExtractError> {
    let (start, end) = payload_range(record, archive_len, path)?;
    if !make_room(path, options.overwrite) {
        return Ok(Outcome::Skipped);
    }

    let length = end - start;
    reader
        .seek(SeekFrom::Start(start))
        .map_err(|e| ExtractError::ReadFailed(e, path.to_path_buf()))?;

    let mut out = BufWriter::new(create_new(path)?);
    let copied = std::io::copy(&mut reader.by_ref().take(length), &mut out)
        .and_then(|copied| out.flush().map(|()| copied));
    drop(out);

    let copied = match copied {
        Ok(copied) => copied,
        Err(e) => {
            discard(path);
            return Err(ExtractError::WriteFailed(e, path.to_path_buf()));
        }
    };

    if copied != length {
        discard(path);
        return Err(ExtractError::ReadFailed(
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("payload ended after {} of {} bytes", copied, length),
            ),
            path.to_path_buf(),
        ));
    }

    Ok(Outcome::File(copied))
}

/// Remove a partially written file.
fn discard(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), %error, "could not remove partial file");
    }
}

fn extract_mapped(
    map: &[u8],
    record: &EntryRecord,
    path: &Path,
    options: &ExtractOptions,
) -> Result<Outcome, ExtractError> {
    let (start, end) = payload_range(record, map.len() as u64, path)?;
    if !make_room(path, options.overwrite) {
        return Ok(Outcome::Skipped);
    }

    let bytes = &map[start as usize..end as usize];
    let mut out = create_new(path)?;
    if let Err(e) = out.write_all(bytes) {
        drop(out);
        discard(path);
        return Err(ExtractError::WriteFailed(e, path.to_path_buf()));
    }

    Ok(Outcome::File(bytes.len() as u64))
}
