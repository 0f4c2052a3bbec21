//! Error taxonomy shared by every stage of the pipeline

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification used for logging and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    CorruptArchive,
    MalformedXml,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::CorruptArchive => "CorruptArchive",
            ErrorKind::MalformedXml => "MalformedXml",
            ErrorKind::Unexpected => "Unexpected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum UnprotectError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a spreadsheet file or directory: {}", path.display())]
    InvalidInput { path: PathBuf },

    #[error("corrupt archive {}: {message}", path.display())]
    CorruptArchive { path: PathBuf, message: String },

    #[error("malformed XML in {}: {message}", path.display())]
    MalformedXml { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unexpected(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UnprotectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnprotectError::NotFound { .. } => ErrorKind::NotFound,
            UnprotectError::InvalidInput { .. } | UnprotectError::Config(_) => {
                ErrorKind::InvalidInput
            }
            UnprotectError::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            UnprotectError::MalformedXml { .. } => ErrorKind::MalformedXml,
            UnprotectError::Io { .. } | UnprotectError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Wrap an I/O error, promoting `ErrorKind::NotFound` to our own `NotFound`
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            UnprotectError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            UnprotectError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn corrupt(path: &Path, message: impl fmt::Display) -> Self {
        UnprotectError::CorruptArchive {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Convert a caught panic payload into an `Unexpected` error
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>, unit: &Path) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        UnprotectError::Unexpected(format!("panic while processing {}: {}", unit.display(), message))
    }
}

pub type Result<T> = std::result::Result<T, UnprotectError>;
