use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures the launcher reports to the user before giving up.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read archive {}: {source}", archive.display())]
    Archive {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("program path is neither a file nor a directory: {}", .0.display())]
    NoProgram(PathBuf),

    #[error(
        "This program needs Python >= {required}, but the current interpreter is {found}.\nPlease upgrade Python."
    )]
    InterpreterTooOld { required: String, found: String },

    #[error("cannot reach {url}: no network connection")]
    Offline { url: String },

    #[error("no terminal extension available for {0}")]
    ExtensionMissing(String),

    #[error("splash toolkit `{0}` is not available")]
    ToolkitUnavailable(String),
}

impl LaunchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
