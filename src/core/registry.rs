//! Thread-safe registry of live background jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::CoreError;
use super::job::{Job, JobState};

/// Maps job names to live jobs for the duration of those jobs only.
///
/// The registry never owns a job's lifecycle; entries are evicted when a
/// job reaches a terminal state (see the observer wrapper installed by
/// [`crate::core::copier::CopyWorker`]) and no history is retained. The
/// internal lock is held strictly for map access; notifications and I/O
/// never run under it, so the registry cannot deadlock against a job's own
/// state-change callback.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Arc<Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job under its name.
    ///
    /// At most one job per name may be live at a time; a second
    /// registration is rejected rather than silently replacing the first.
    pub fn register(&self, job: Arc<Job>) -> Result<(), CoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(job.name()) {
            return Err(CoreError::DuplicateJob(job.name().to_string()));
        }
        jobs.insert(job.name().to_string(), job);
        Ok(())
    }

    /// Removes a job by name. Removing an unknown name is a no-op.
    pub fn unregister(&self, job_name: &str) {
        self.jobs.lock().unwrap().remove(job_name);
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<Job>> {
        self.jobs.lock().unwrap().get(job_name).cloned()
    }

    /// Number of registered jobs whose worker is executing or about to,
    /// computed at call time.
    pub fn active_count(&self) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| matches!(job.state(), JobState::Queued | JobState::Running))
            .count()
    }

    /// A consistent point-in-time copy of name → state for reporting.
    pub fn snapshot(&self) -> HashMap<String, JobState> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .map(|(name, job)| (name.clone(), job.state()))
            .collect()
    }
}
