use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("volume unavailable for {}: {source}", .path.display())]
    VolumeUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("{} is {size} bytes, limit is {limit}", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("other error: {0}")]
    Other(String),
}

/// Coarse classification of [`Error`], stable across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    NotADirectory,
    VolumeUnavailable,
    UnsupportedFormat,
    TooLarge,
    Io,
    Internal,
}

impl Error {
    /// Classifies an I/O failure observed while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path),
            io::ErrorKind::NotADirectory => Error::NotADirectory(path),
            _ => Error::Io { path, source: err },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::NotADirectory(_) => ErrorKind::NotADirectory,
            Error::VolumeUnavailable { .. } => ErrorKind::VolumeUnavailable,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::TooLarge { .. } => ErrorKind::TooLarge,
            Error::Io { .. } => ErrorKind::Io,
            Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// The path the failure refers to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::NotFound(path) | Error::PermissionDenied(path) | Error::NotADirectory(path) => {
                Some(path.as_path())
            }
            Error::VolumeUnavailable { path, .. }
            | Error::TooLarge { path, .. }
            | Error::Io { path, .. } => Some(path.as_path()),
            Error::UnsupportedFormat(_) | Error::Other(_) => None,
        }
    }

    /// Volume queries fail transiently (unplugged drive, dropped share); the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::VolumeUnavailable { .. })
    }
}

/// An entry that could not be read and was left out of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

impl SkippedEntry {
    pub fn new(path: &Path, reason: impl ToString) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Attached to a successful response whose traversal did not cover everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResultWarning {
    pub skipped: Vec<SkippedEntry>,
    pub cancelled: bool,
}

impl PartialResultWarning {
    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty() && !self.cancelled
    }
}
