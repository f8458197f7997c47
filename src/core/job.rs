//! The job state machine shared by all background operations.
//!
//! A [`Job`] is one tracked unit of asynchronous work. Its lifecycle is a
//! strict state machine:
//!
//! ```text
//! Queued --(cancel before start)--> Cancelled
//! Queued --(worker starts)--------> Running
//! Running --(all work done)-------> Completed
//! Running --(unhandled error)-----> Failed
//! Running --(cancel flag seen)----> Cancelled
//! ```
//!
//! `Completed`, `Failed` and `Cancelled` are terminal; once a job reaches
//! one of them no further transition is possible and no further
//! notification is emitted.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::error::CoreError;

/// Lifecycle state of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Returns `true` for states that permit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// The work a job was created for.
#[derive(Debug, Clone)]
pub enum JobKind {
    /// Copy a batch of files into a destination root.
    Copy {
        files: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Walk a source tree and group its media files by date.
    Scan { source: PathBuf },
}

/// Receives the side-effecting notifications a job emits as it runs.
///
/// Implementations are invoked from the job's worker context and must
/// marshal onto their own thread if they are not thread-safe. All methods
/// default to no-ops so observers only implement what they care about.
pub trait JobObserver: Send + Sync + 'static {
    /// Called exactly once per state transition, never from within a lock.
    fn on_state_change(&self, _job_name: &str, _state: JobState) {}

    /// Called after each unit of work as `(attempted_so_far, total)`.
    fn on_progress(&self, _current: usize, _total: usize) {}

    /// Called once when the job finishes all of its work.
    fn on_complete(&self, _job_name: &str) {}

    /// Called once when the job fails, with a human-readable message.
    fn on_error(&self, _job_name: &str, _message: &str) {}
}

/// An observer that ignores every notification.
pub struct NullObserver;

impl JobObserver for NullObserver {}

struct JobInner {
    state: JobState,
    error: Option<String>,
}

/// One tracked unit of background work.
///
/// The cancel flag is monotonic: once requested it can never be cleared.
/// State lives behind a mutex that is held only while the transition is
/// decided; observer notifications always happen after it is released.
pub struct Job {
    name: String,
    kind: JobKind,
    cancel_requested: Arc<AtomicBool>,
    inner: Mutex<JobInner>,
    observer: Arc<dyn JobObserver>,
}

impl Job {
    /// Creates a job in `Queued`. The initial state is announced to the
    /// observer at registration time, not here, so a job rejected for a
    /// duplicate name never surfaces to the caller.
    pub fn new(name: impl Into<String>, kind: JobKind, observer: Arc<dyn JobObserver>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            cancel_requested: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(JobInner {
                state: JobState::Queued,
                error: None,
            }),
            observer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn state(&self) -> JobState {
        self.inner.lock().unwrap().state
    }

    /// The failure description, set only when the job transitioned to `Failed`.
    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// A shareable view of the cancel flag for workers that poll it at
    /// their own check points.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_requested.clone()
    }

    pub(crate) fn observer(&self) -> &Arc<dyn JobObserver> {
        &self.observer
    }

    /// Announces the initial `Queued` state. Called once, right after the
    /// job has been accepted.
    pub(crate) fn announce_queued(&self) {
        self.observer.on_state_change(&self.name, JobState::Queued);
    }

    /// Requests cooperative cancellation.
    ///
    /// Returns `true` iff this call set the flag on a non-terminal job. A
    /// job that has not started yet is finalized as `Cancelled` right away;
    /// a running job finalizes itself at its next cancellation check point.
    pub fn cancel(&self) -> bool {
        let not_yet_started = {
            let inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return false;
            }
            if self.cancel_requested.swap(true, Ordering::SeqCst) {
                return false;
            }
            inner.state == JobState::Queued
        };

        if not_yet_started {
            // The worker may have slipped into Running meanwhile; the
            // idempotent guard in `transition` keeps this race benign.
            self.transition(JobState::Cancelled, None);
        }
        true
    }

    /// Moves the job into `state`, returning `true` if the transition took
    /// effect. Setting the current state again or transitioning out of a
    /// terminal state is a no-op, so every state is notified at most once.
    pub(crate) fn set_state(&self, state: JobState) -> bool {
        self.transition(state, None)
    }

    /// Finalizes the job as `Failed`, recording the error message.
    pub(crate) fn fail(&self, message: impl Into<String>) -> bool {
        self.transition(JobState::Failed, Some(message.into()))
    }

    fn transition(&self, next: JobState, error: Option<String>) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == next || inner.state.is_terminal() {
                return false;
            }
            inner.state = next;
            if next == JobState::Failed {
                inner.error = error;
            }
        }
        // Notify outside the lock so an observer can re-query the job.
        self.observer.on_state_change(&self.name, next);
        true
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("cancel_requested", &self.is_cancel_requested())
            .finish()
    }
}

/// Public handle to a spawned job.
///
/// Pairs the live [`Job`] with the tokio task executing it, making the
/// cancel and join semantics explicit instead of relying on detached
/// daemon-style workers.
#[derive(Debug)]
pub struct JobHandle {
    job: Arc<Job>,
    handle: JoinHandle<()>,
}

impl JobHandle {
    pub(crate) fn new(job: Arc<Job>, handle: JoinHandle<()>) -> Self {
        Self { job, handle }
    }

    pub fn name(&self) -> &str {
        self.job.name()
    }

    pub fn state(&self) -> JobState {
        self.job.state()
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    /// See [`Job::cancel`].
    pub fn cancel(&self) -> bool {
        self.job.cancel()
    }

    /// Waits for the worker to finish. The job's terminal state has already
    /// been delivered through the observer by the time this returns.
    pub async fn join(self) -> Result<(), CoreError> {
        self.handle.await.map_err(CoreError::Join)
    }
}
