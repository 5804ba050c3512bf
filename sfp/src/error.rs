use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot determine the current directory")]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot list directory `{}`", .path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: sfp_format::OpenError,
    },

    #[error("Cannot derive an output directory for `{}`; pass one with -o", .path.display())]
    NoDestination { path: PathBuf },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot extract files")]
    Extract {
        #[source]
        source: sfp_format::ExtractError,
    },

    #[error("{failed} of {total} archive(s) could not be processed")]
    ArchivesFailed { failed: usize, total: usize },
}
