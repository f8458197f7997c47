//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// This enum encapsulates all possible errors that can occur during
/// core operations like job registration, file copying, and source scanning.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents an error that occurred when a Tokio task was joined.
    /// This is often due to a task panicking or being cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Represents a path that was expected to be a directory but was not.
    #[error("Path is not a valid directory: {0}")]
    NotADirectory(PathBuf),

    /// Represents an attempt to register a job under a name that is
    /// already taken by a live job.
    #[error("A job named '{0}' is already running")]
    DuplicateJob(String),

    /// Represents a copy request that contained no files.
    #[error("Copy job contains no files")]
    EmptyBatch,

    /// Represents a user-initiated cancellation of an operation.
    ///
    /// Cancellation is a distinct outcome, not a failure; callers route it
    /// to their cancelled path rather than their error path.
    #[error("Operation was cancelled by the user")]
    Cancelled,
}

impl CoreError {
    /// Returns `true` when this error represents a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}
