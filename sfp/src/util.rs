use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Trailing `*` or `*.ext` component of an input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Any,
    Extension(String),
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Extension("sfp".into())
    }
}

impl Pattern {
    pub fn parse(s: &str) -> Option<Pattern> {
        let rest = s.strip_prefix('*')?;
        if rest.is_empty() {
            return Some(Pattern::Any);
        }

        let ext = rest.strip_prefix('.')?;
        if !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
            Some(Pattern::Extension(ext.to_string()))
        } else {
            None
        }
    }

    pub fn matches(&self, file_name: &OsStr) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Extension(ext) => Path::new(file_name)
                .extension()
                .and_then(OsStr::to_str)
                .map(|x| x.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
        }
    }
}

/// Split a raw command-line input into an absolute path and the pattern used if that
/// path turns out to be a directory.
pub fn split_input(raw: &Path, cwd: &Path) -> (PathBuf, Pattern) {
    let mut path = match raw.to_str() {
        Some(s) if s.len() > 2 && s.starts_with('"') && s.ends_with('"') => {
            PathBuf::from(&s[1..s.len() - 1])
        }
        _ => raw.to_path_buf(),
    };

    let mut pattern = Pattern::default();
    if let Some(p) = path
        .file_name()
        .and_then(OsStr::to_str)
        .and_then(Pattern::parse)
    {
        pattern = p;
        path = match path.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
    }

    if path.is_relative() {
        path = cwd.join(path);
    }

    (path, pattern)
}

/// Every archive an input names: the file itself, or the matching files directly inside
/// a directory, sorted by name.
pub fn resolve_input(raw: &Path) -> Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir().map_err(|source| Error::CurrentDir { source })?;
    let (path, pattern) = split_input(raw, &cwd);

    if !path.is_dir() {
        return Ok(vec![path]);
    }

    let mut files = Vec::new();
    for entry in jwalk::WalkDir::new(&path)
        .max_depth(1)
        .skip_hidden(false)
        .sort(true)
    {
        let entry = entry.map_err(|source| Error::ListDirectory {
            path: path.clone(),
            source,
        })?;
        if entry.depth == 0 {
            continue;
        }

        let file = entry.path();
        if file.is_file() && pattern.matches(&entry.file_name) {
            files.push(file);
        }
    }

    tracing::debug!(dir = %path.display(), ?pattern, count = files.len(), "expanded input");
    Ok(files)
}

pub fn format_size(bytes: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};

    bytes
        .file_size(options::BINARY)
        .unwrap_or_else(|_| bytes.to_string())
}
