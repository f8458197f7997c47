//! The background job execution and coordination subsystem.
//!
//! Everything here runs on worker tasks and reports back through
//! observers; nothing in this module blocks the caller or touches
//! presentation concerns.

pub mod copier;
pub mod dates;
pub mod error;
pub mod job;
pub mod metadata;
pub mod registry;
pub mod scanner;
pub mod sequencer;

pub use copier::{CopyWorker, NO_EXTENSION_BUCKET};
pub use dates::DateSource;
pub use error::CoreError;
pub use job::{Job, JobHandle, JobKind, JobObserver, JobState, NullObserver};
pub use registry::JobRegistry;
pub use scanner::{DateGroups, SourceScanner, SUPPORTED_EXTENSIONS};
pub use sequencer::RequestSequencer;
