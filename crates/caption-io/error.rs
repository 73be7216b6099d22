//! Error type for filesystem operations

use std::path::PathBuf;

use caption_core::CoreError;
use thiserror::Error;

/// Failure of a caption-io operation
#[derive(Error, Debug)]
pub enum IoError {
    /// Decoding or encoding failed inside the engine
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A file could not be read or written
    #[error("{}: {source}", path.display())]
    File {
        /// File the operation was working on
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON was malformed or did not describe a document
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl IoError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Underlying OS error kind for file failures
    #[must_use]
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::File { source, .. } => Some(source.kind()),
            Self::Core(_) | Self::Snapshot(_) => None,
        }
    }
}

/// Result alias for caption-io operations
pub type Result<T> = core::result::Result<T, IoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_errors_name_the_path() {
        let err = IoError::file(
            "missing.srt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "missing.srt: no such file");
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn engine_errors_are_transparent() {
        let err = IoError::from(CoreError::UnrecognizedFormat);
        assert_eq!(err.to_string(), CoreError::UnrecognizedFormat.to_string());
        assert_eq!(err.io_kind(), None);
    }
}
