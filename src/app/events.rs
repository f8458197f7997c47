//! Defines the events the background workers emit toward the caller.

use std::path::PathBuf;

use crate::core::{DateGroups, JobState};

/// Events sent from worker context to the caller's execution context.
///
/// Every outbound callback of the core surfaces as one of these variants;
/// the caller drains them on its own thread (event loop, CLI loop, test
/// channel) so workers never touch presentation state directly.
#[derive(Debug)]
pub enum OrganizerEvent {
    /// A scan request was accepted and its worker spawned.
    ScanStarted { source: PathBuf },
    /// Scan progress as `(files_processed, total_candidates)`.
    ScanProgress { processed: usize, total: usize },
    /// A scan finished; the grouping is handed over by value.
    ScanCompleted {
        source: PathBuf,
        groups: DateGroups,
    },
    /// A scan failed with a human-readable message.
    ScanFailed(String),
    /// A scan honored a cancellation request. Not an error.
    ScanCancelled,
    /// Copy progress for one job as `(files_attempted, total)`.
    CopyProgress {
        job: String,
        current: usize,
        total: usize,
    },
    /// A copy job moved through its state machine.
    CopyStateChanged { job: String, state: JobState },
    /// A copy job finished all of its files.
    CopyCompleted { job: String },
    /// A copy job failed; already-copied files stay in place.
    CopyFailed { job: String, message: String },
}
