//! Wires the core coordinators to the caller through the event proxy.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::events::OrganizerEvent;
use super::proxy::EventProxy;
use crate::core::{
    CopyWorker, CoreError, DateSource, Job, JobHandle, JobKind, JobObserver, JobState,
    NullObserver, RequestSequencer, SourceScanner,
};

/// Runs source-folder scans on worker tasks and marshals their results.
///
/// Starting a new scan supersedes any in-flight one: the old worker is
/// asked to cancel cooperatively and, regardless of when it finishes, its
/// result is discarded as stale. Only the latest request ever reaches the
/// caller's callbacks.
pub struct ScanController<P: EventProxy> {
    proxy: P,
    sequencer: Arc<RequestSequencer>,
    current_scan: Mutex<Option<Arc<Job>>>,
}

impl<P: EventProxy> ScanController<P> {
    pub fn new(proxy: P) -> Self {
        Self {
            proxy,
            sequencer: Arc::new(RequestSequencer::new()),
            current_scan: Mutex::new(None),
        }
    }

    /// Kicks off an asynchronous scan for the provided folder.
    pub fn start_scan(&self, source: PathBuf, date_source: DateSource) {
        let request_id = self.sequencer.issue();

        let job = Job::new(
            format!("scan-{request_id}"),
            JobKind::Scan {
                source: source.clone(),
            },
            Arc::new(NullObserver),
        );
        // Swap under the lock, cancel after releasing it: cancellation can
        // notify the superseded job's observer, and notifications never run
        // while a lock is held.
        let previous = {
            let mut current = self.current_scan.lock().unwrap();
            current.replace(job.clone())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        self.proxy.send_event(OrganizerEvent::ScanStarted {
            source: source.clone(),
        });

        let proxy = self.proxy.clone();
        let sequencer = self.sequencer.clone();
        let scanner = SourceScanner::new(date_source);
        tokio::spawn(async move {
            job.set_state(JobState::Running);

            let progress_proxy = proxy.clone();
            let progress_sequencer = sequencer.clone();
            let result = scanner
                .scan_with_progress(&source, job.cancel_flag(), move |processed, total| {
                    // Progress from a superseded scan is noise; drop it.
                    if progress_sequencer.is_current(request_id) {
                        progress_proxy
                            .send_event(OrganizerEvent::ScanProgress { processed, total });
                    }
                })
                .await;

            let is_current = sequencer.is_current(request_id);
            match result {
                Ok(groups) => {
                    job.set_state(JobState::Completed);
                    if is_current {
                        proxy.send_event(OrganizerEvent::ScanCompleted { source, groups });
                    } else {
                        tracing::info!("Discarding stale scan result for {}", source.display());
                    }
                }
                Err(err) if err.is_cancelled() => {
                    job.set_state(JobState::Cancelled);
                    if is_current {
                        proxy.send_event(OrganizerEvent::ScanCancelled);
                    }
                }
                Err(err) => {
                    let message = err.to_string();
                    job.fail(&message);
                    if is_current {
                        proxy.send_event(OrganizerEvent::ScanFailed(message));
                    } else {
                        tracing::info!("Discarding stale scan error: {}", message);
                    }
                }
            }
        });
    }

    /// Requests cancellation of the in-flight scan, if any.
    pub fn cancel_scan(&self) -> bool {
        let current = self.current_scan.lock().unwrap();
        match current.as_ref() {
            Some(job) => job.cancel(),
            None => false,
        }
    }
}

/// Coordinates copy jobs and forwards their callbacks as events.
pub struct CopyController<P: EventProxy> {
    worker: CopyWorker,
    proxy: P,
}

impl<P: EventProxy> CopyController<P> {
    pub fn new(proxy: P) -> Self {
        Self {
            worker: CopyWorker::new(),
            proxy,
        }
    }

    /// Starts a copy job whose observer callbacks surface as
    /// [`OrganizerEvent`]s on the caller's channel.
    pub fn start_copy(
        &self,
        job_name: impl Into<String>,
        files: Vec<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<JobHandle, CoreError> {
        let job_name = job_name.into();
        let observer = Arc::new(EventForwarder {
            job: job_name.clone(),
            proxy: self.proxy.clone(),
        });
        self.worker
            .start_copy(job_name, files, destination, observer)
    }

    pub fn cancel(&self, job_name: &str) -> bool {
        self.worker.cancel(job_name)
    }

    pub fn active_job_count(&self) -> usize {
        self.worker.active_job_count()
    }

    pub fn list_jobs(&self) -> std::collections::HashMap<String, JobState> {
        self.worker.list_jobs()
    }
}

/// Adapts the core's observer interface onto the event proxy. One
/// forwarder exists per job, so progress pairs can be attributed to it.
struct EventForwarder<P: EventProxy> {
    job: String,
    proxy: P,
}

impl<P: EventProxy> JobObserver for EventForwarder<P> {
    fn on_state_change(&self, job_name: &str, state: JobState) {
        self.proxy.send_event(OrganizerEvent::CopyStateChanged {
            job: job_name.to_string(),
            state,
        });
    }

    fn on_progress(&self, current: usize, total: usize) {
        self.proxy.send_event(OrganizerEvent::CopyProgress {
            job: self.job.clone(),
            current,
            total,
        });
    }

    fn on_complete(&self, job_name: &str) {
        self.proxy.send_event(OrganizerEvent::CopyCompleted {
            job: job_name.to_string(),
        });
    }

    fn on_error(&self, job_name: &str, message: &str) {
        self.proxy.send_event(OrganizerEvent::CopyFailed {
            job: job_name.to_string(),
            message: message.to_string(),
        });
    }
}
