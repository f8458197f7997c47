//! The copy coordinator: batch file copies as tracked background jobs.
//!
//! Files are partitioned into per-extension buckets under
//! `destination/<job_name>/<ext>/` and copied one by one with
//! collision-safe renaming. The cancel flag is checked before every bucket
//! directory and every individual copy; cancellation leaves already-copied
//! files in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;

use super::error::CoreError;
use super::job::{Job, JobHandle, JobKind, JobObserver, JobState};
use super::registry::JobRegistry;

/// Bucket name for files without an extension.
pub const NO_EXTENSION_BUCKET: &str = "no_extension";

/// Spawns and tracks copy jobs. Each invocation runs independently on its
/// own blocking worker; the registry is the only state shared across jobs.
#[derive(Default)]
pub struct CopyWorker {
    registry: Arc<JobRegistry>,
}

impl CopyWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Validates and queues a copy job, then starts its worker.
    ///
    /// Rejected synchronously, before any worker starts: an empty file
    /// batch and a job name that is already live.
    pub fn start_copy(
        &self,
        job_name: impl Into<String>,
        files: Vec<PathBuf>,
        destination: impl Into<PathBuf>,
        observer: Arc<dyn JobObserver>,
    ) -> Result<JobHandle, CoreError> {
        let job_name = job_name.into();
        if files.is_empty() {
            return Err(CoreError::EmptyBatch);
        }

        // Terminal jobs evict themselves from the registry through this
        // wrapper, so the name becomes reusable the moment the caller
        // hears about the terminal state.
        let observer: Arc<dyn JobObserver> = Arc::new(EvictOnTerminal {
            inner: observer,
            registry: self.registry.clone(),
        });

        let kind = JobKind::Copy {
            files,
            destination: destination.into(),
        };
        let job = Job::new(job_name, kind, observer);
        self.registry.register(job.clone())?;
        job.announce_queued();

        tracing::info!("Queued copy job '{}'", job.name());
        let worker_job = job.clone();
        let handle = tokio::task::spawn_blocking(move || run_copy(&worker_job));
        Ok(JobHandle::new(job, handle))
    }

    /// Requests cancellation of a live job by name. Returns `false` for
    /// unknown names, terminal jobs, and repeated requests.
    pub fn cancel(&self, job_name: &str) -> bool {
        match self.registry.get(job_name) {
            Some(job) => job.cancel(),
            None => false,
        }
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<Job>> {
        self.registry.get(job_name)
    }

    pub fn active_job_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn list_jobs(&self) -> std::collections::HashMap<String, JobState> {
        self.registry.snapshot()
    }
}

/// Forwards notifications to the caller's observer and unregisters the job
/// once it reaches a terminal state.
struct EvictOnTerminal {
    inner: Arc<dyn JobObserver>,
    registry: Arc<JobRegistry>,
}

impl JobObserver for EvictOnTerminal {
    fn on_state_change(&self, job_name: &str, state: JobState) {
        self.inner.on_state_change(job_name, state);
        if state.is_terminal() {
            self.registry.unregister(job_name);
        }
    }

    fn on_progress(&self, current: usize, total: usize) {
        self.inner.on_progress(current, total);
    }

    fn on_complete(&self, job_name: &str) {
        self.inner.on_complete(job_name);
    }

    fn on_error(&self, job_name: &str, message: &str) {
        self.inner.on_error(job_name, message);
    }
}

/// Worker entry point: drives the job through its state machine.
fn run_copy(job: &Job) {
    if job.is_cancel_requested() {
        // Cancelled before the worker began; `cancel` may already have
        // finalized the state, in which case this is a silent no-op.
        job.set_state(JobState::Cancelled);
        return;
    }
    if !job.set_state(JobState::Running) {
        return;
    }

    match copy_batch(job) {
        Ok(()) => {
            tracing::info!("Copy job '{}' completed", job.name());
            if job.set_state(JobState::Completed) {
                job.observer().on_complete(job.name());
            }
        }
        Err(CoreError::Cancelled) => {
            tracing::info!("Copy job '{}' cancelled", job.name());
            job.set_state(JobState::Cancelled);
        }
        Err(err) => {
            let message = err.to_string();
            tracing::error!("Copy job '{}' failed: {}", job.name(), message);
            if job.fail(&message) {
                job.observer().on_error(job.name(), &message);
            }
        }
    }
}

fn copy_batch(job: &Job) -> Result<(), CoreError> {
    let JobKind::Copy { files, destination } = job.kind() else {
        tracing::error!("Copy worker started with non-copy job '{}'", job.name());
        return Ok(());
    };

    let main_folder = destination.join(job.name());
    fs::create_dir_all(&main_folder).map_err(|e| CoreError::Io(e, main_folder.clone()))?;

    let total = files.len();
    let mut attempted = 0;

    for (bucket, bucket_files) in partition_by_extension(files) {
        if job.is_cancel_requested() {
            return Err(CoreError::Cancelled);
        }
        let bucket_dir = main_folder.join(&bucket);
        fs::create_dir_all(&bucket_dir).map_err(|e| CoreError::Io(e, bucket_dir.clone()))?;

        for file in bucket_files {
            if job.is_cancel_requested() {
                return Err(CoreError::Cancelled);
            }
            copy_into_bucket(file, &bucket_dir)?;
            attempted += 1;
            job.observer().on_progress(attempted, total);
        }
    }
    Ok(())
}

/// Groups files by lower-cased extension, buckets in first-seen order and
/// files within a bucket in input order.
fn partition_by_extension(files: &[PathBuf]) -> Vec<(String, Vec<&PathBuf>)> {
    let mut buckets: Vec<(String, Vec<&PathBuf>)> = Vec::new();
    for file in files {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| NO_EXTENSION_BUCKET.to_string());

        match buckets.iter_mut().find(|(name, _)| *name == ext) {
            Some((_, entries)) => entries.push(file),
            None => buckets.push((ext, vec![file])),
        }
    }
    buckets
}

/// Copies one file into its bucket directory, never overwriting: on a name
/// collision the stem gets a numeric suffix (`name_1.ext`, `name_2.ext`, …).
/// The source's modification time is re-applied to the copy, best effort.
fn copy_into_bucket(source: &Path, bucket_dir: &Path) -> Result<(), CoreError> {
    let file_name = source.file_name().ok_or_else(|| {
        CoreError::Io(
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            source.to_path_buf(),
        )
    })?;

    let mut dest = bucket_dir.join(file_name);
    if dest.exists() {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let ext = source.extension().and_then(|e| e.to_str());
        let mut counter = 1;
        loop {
            let candidate_name = match ext {
                Some(ext) => format!("{stem}_{counter}.{ext}"),
                None => format!("{stem}_{counter}"),
            };
            let candidate = bucket_dir.join(candidate_name);
            if !candidate.exists() {
                dest = candidate;
                break;
            }
            counter += 1;
        }
    }

    fs::copy(source, &dest).map_err(|e| CoreError::Io(e, source.to_path_buf()))?;

    if let Ok(meta) = fs::metadata(source) {
        let mtime = FileTime::from_last_modification_time(&meta);
        if let Err(err) = filetime::set_file_mtime(&dest, mtime) {
            tracing::debug!(
                "Could not preserve mtime for {}: {}",
                dest.display(),
                err
            );
        }
    }
    Ok(())
}
