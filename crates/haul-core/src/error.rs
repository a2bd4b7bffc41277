//! Error taxonomy shared by the engine and the filesystem adapters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by filesystem adapters and validation.
pub type FsResult<T> = Result<T, OperationError>;

/// Kind of failure, independent of the platform that produced it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum ErrorKind {
    /// The entry does not exist.
    #[strum(serialize = "not found")]
    NotFound,
    /// Access to the entry was refused.
    #[strum(serialize = "permission denied")]
    PermissionDenied,
    /// An explicit create or rename target is already taken.
    #[strum(serialize = "already exists")]
    AlreadyExists,
    /// Empty, contains a path separator, or otherwise illegal name.
    #[strum(serialize = "invalid name")]
    InvalidName,
    /// A source is the destination or one of its ancestors.
    #[strum(serialize = "source contains destination")]
    AncestorConflict,
    /// The archive could not be read or written in the expected format.
    #[strum(serialize = "archive format error")]
    ArchiveFormatError,
    /// The request itself is malformed (wrong source count, missing names).
    #[strum(serialize = "invalid request")]
    InvalidRequest,
    /// Any other adapter-level failure.
    #[strum(serialize = "I/O error")]
    IoError,
    /// The operation was cancelled before this entry was attempted.
    #[strum(serialize = "cancelled")]
    Cancelled,
}

/// A typed failure attached to the path that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {kind}: {message}", .path.display())]
pub struct OperationError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(kind: ErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Translate a platform I/O error into the taxonomy.
    pub fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let kind = match source.kind() {
            Io::NotFound => ErrorKind::NotFound,
            Io::PermissionDenied => ErrorKind::PermissionDenied,
            Io::AlreadyExists => ErrorKind::AlreadyExists,
            Io::InvalidInput => ErrorKind::InvalidName,
            _ => ErrorKind::IoError,
        };
        Self::new(kind, path, source.to_string())
    }

    /// Entry does not exist.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::NotFound, path, "No such file or directory")
    }

    /// Target name is already taken.
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::AlreadyExists, path, "Already exists")
    }

    /// Name failed validation.
    pub fn invalid_name(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidName, path, message)
    }

    /// Malformed request.
    pub fn invalid_request(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, path, message)
    }

    /// Source is the destination or contains it.
    pub fn ancestor_conflict(source: &Path, destination: &Path) -> Self {
        Self::new(
            ErrorKind::AncestorConflict,
            source,
            format!("Cannot place a directory inside itself ({})", destination.display()),
        )
    }

    /// Archive could not be processed.
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArchiveFormatError, path, message)
    }

    /// Catch-all adapter failure.
    pub fn other(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError, path, message)
    }

    /// Entry skipped because the operation was cancelled.
    pub fn cancelled(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorKind::Cancelled, path, "Operation cancelled")
    }
}
