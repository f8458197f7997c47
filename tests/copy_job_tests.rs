//! Integration tests for the copy-job path: partitioning, collision
//! handling, progress ordering, cancellation, and registry bookkeeping.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use camera_organizer::app::events::OrganizerEvent;
use camera_organizer::app::CopyController;
use camera_organizer::core::{
    CopyWorker, CoreError, Job, JobKind, JobObserver, JobState, NullObserver,
};
use camera_organizer::utils::test_helpers::setup_test_logging;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Contains the test infrastructure.
mod helpers {
    use super::*;

    #[derive(Debug, PartialEq, Eq, Clone)]
    pub enum Notification {
        State(JobState),
        Progress(usize, usize),
        Complete,
        Error(String),
    }

    /// Records every observer callback in arrival order.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingObserver {
        pub fn states(&self) -> Vec<JobState> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::State(state) => Some(*state),
                    _ => None,
                })
                .collect()
        }

        pub fn progress(&self) -> Vec<(usize, usize)> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Progress(current, total) => Some((*current, *total)),
                    _ => None,
                })
                .collect()
        }

        pub fn completed(&self) -> bool {
            self.notifications
                .lock()
                .unwrap()
                .contains(&Notification::Complete)
        }

        pub fn errors(&self) -> Vec<String> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Error(message) => Some(message.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl JobObserver for RecordingObserver {
        fn on_state_change(&self, _job_name: &str, state: JobState) {
            self.notifications
                .lock()
                .unwrap()
                .push(Notification::State(state));
        }

        fn on_progress(&self, current: usize, total: usize) {
            self.notifications
                .lock()
                .unwrap()
                .push(Notification::Progress(current, total));
        }

        fn on_complete(&self, _job_name: &str) {
            self.notifications.lock().unwrap().push(Notification::Complete);
        }

        fn on_error(&self, _job_name: &str, message: &str) {
            self.notifications
                .lock()
                .unwrap()
                .push(Notification::Error(message.to_string()));
        }
    }

    /// A source tree plus a destination root in one temp dir.
    pub struct CopyFixture {
        pub destination: PathBuf,
        root: PathBuf,
        _temp_dir: TempDir,
    }

    impl CopyFixture {
        pub fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let root = temp_dir.path().to_path_buf();
            let destination = root.join("organized");
            fs::create_dir_all(&destination).expect("Failed to create destination");
            Self {
                destination,
                root,
                _temp_dir: temp_dir,
            }
        }

        /// Creates a source file and returns its absolute path.
        pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(&path, content).expect("Failed to write file");
            path
        }

        /// All regular files below a directory, recursively.
        pub fn file_count_under(&self, dir: &PathBuf) -> usize {
            walk_files(dir)
        }
    }

    fn walk_files(dir: &PathBuf) -> usize {
        let mut count = 0;
        for entry in fs::read_dir(dir).expect("Failed to read dir") {
            let entry = entry.expect("Failed to read entry");
            let path = entry.path();
            if path.is_dir() {
                count += walk_files(&path);
            } else {
                count += 1;
            }
        }
        count
    }
}

use helpers::{CopyFixture, RecordingObserver};

#[tokio::test]
async fn copy_buckets_by_extension_and_renames_collisions() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    // Duplicate basenames from two different source folders.
    let a1 = fixture.create_file("cardA/a.jpg", "first a");
    let b = fixture.create_file("cardA/b.jpg", "b");
    let a2 = fixture.create_file("cardB/a.jpg", "second a");

    let worker = CopyWorker::new();
    let observer = Arc::new(RecordingObserver::default());
    let handle = worker
        .start_copy(
            "trip1",
            vec![a1, b, a2],
            fixture.destination.clone(),
            observer.clone(),
        )
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    let bucket = fixture.destination.join("trip1").join("jpg");
    assert_eq!(fs::read_to_string(bucket.join("a.jpg")).unwrap(), "first a");
    assert_eq!(fs::read_to_string(bucket.join("b.jpg")).unwrap(), "b");
    assert_eq!(fs::read_to_string(bucket.join("a_1.jpg")).unwrap(), "second a");
    assert_eq!(fixture.file_count_under(&bucket), 3);

    // One progress call per file, strictly increasing, ending at the total.
    assert_eq!(observer.progress(), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(
        observer.states(),
        vec![JobState::Queued, JobState::Running, JobState::Completed]
    );
    assert!(observer.completed());
    assert!(observer.errors().is_empty());

    // Terminal jobs evict themselves; the name is free again.
    assert_eq!(worker.active_job_count(), 0);
    assert!(worker.list_jobs().is_empty());
}

#[tokio::test]
async fn rerunning_a_job_never_overwrites_earlier_copies() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let files = vec![
        fixture.create_file("card/a.jpg", "a"),
        fixture.create_file("card/b.jpg", "b"),
    ];

    let worker = CopyWorker::new();
    for _ in 0..2 {
        let handle = worker
            .start_copy(
                "trip1",
                files.clone(),
                fixture.destination.clone(),
                Arc::new(NullObserver),
            )
            .expect("job starts");
        handle.join().await.expect("worker finishes");
    }

    // Second run found every name taken and copied renamed siblings.
    let bucket = fixture.destination.join("trip1").join("jpg");
    assert_eq!(fixture.file_count_under(&bucket), 4);
    for name in ["a.jpg", "b.jpg", "a_1.jpg", "b_1.jpg"] {
        assert!(bucket.join(name).exists(), "missing {name}");
    }
}

#[tokio::test]
async fn files_without_extension_get_their_own_bucket() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let photo = fixture.create_file("card/IMG_1.JPG", "photo");
    let raw = fixture.create_file("card/README", "no extension");

    let worker = CopyWorker::new();
    let handle = worker
        .start_copy(
            "mixed",
            vec![photo, raw],
            fixture.destination.clone(),
            Arc::new(NullObserver),
        )
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    let job_dir = fixture.destination.join("mixed");
    assert!(job_dir.join("jpg").join("IMG_1.JPG").exists());
    assert!(job_dir.join("no_extension").join("README").exists());
}

#[tokio::test]
async fn duplicate_job_name_is_rejected_synchronously() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let file = fixture.create_file("card/a.jpg", "a");

    let worker = CopyWorker::new();
    // Occupy the name with a live job that never runs.
    let kind = JobKind::Copy {
        files: vec![file.clone()],
        destination: fixture.destination.clone(),
    };
    worker
        .registry()
        .register(Job::new("import", kind, Arc::new(NullObserver)))
        .unwrap();

    let observer = Arc::new(RecordingObserver::default());
    let err = worker
        .start_copy(
            "import",
            vec![file],
            fixture.destination.clone(),
            observer.clone(),
        )
        .expect_err("duplicate must be rejected");

    assert!(matches!(err, CoreError::DuplicateJob(name) if name == "import"));
    assert_eq!(worker.list_jobs().len(), 1, "registry size unchanged");
    assert!(
        observer.notifications.lock().unwrap().is_empty(),
        "rejected job must not notify"
    );
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let worker = CopyWorker::new();

    let err = worker
        .start_copy(
            "empty",
            Vec::new(),
            fixture.destination.clone(),
            Arc::new(NullObserver),
        )
        .expect_err("empty batch must be rejected");
    assert!(matches!(err, CoreError::EmptyBatch));
    assert_eq!(worker.active_job_count(), 0);
}

/// Cancels its own job once the third progress notification arrives.
struct CancelAtThree {
    worker: Arc<CopyWorker>,
    recorder: Arc<RecordingObserver>,
}

impl JobObserver for CancelAtThree {
    fn on_state_change(&self, job_name: &str, state: JobState) {
        self.recorder.on_state_change(job_name, state);
    }

    fn on_progress(&self, current: usize, total: usize) {
        self.recorder.on_progress(current, total);
        if current == 3 {
            assert!(self.worker.cancel("big-import"));
        }
    }

    fn on_complete(&self, job_name: &str) {
        self.recorder.on_complete(job_name);
    }

    fn on_error(&self, job_name: &str, message: &str) {
        self.recorder.on_error(job_name, message);
    }
}

#[tokio::test]
async fn cancel_mid_copy_stops_after_the_current_file() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let files: Vec<PathBuf> = (0..10)
        .map(|i| fixture.create_file(&format!("card/img_{i:02}.jpg"), "data"))
        .collect();

    let worker = Arc::new(CopyWorker::new());
    let recorder = Arc::new(RecordingObserver::default());
    let observer = Arc::new(CancelAtThree {
        worker: worker.clone(),
        recorder: recorder.clone(),
    });

    let handle = worker
        .start_copy("big-import", files, fixture.destination.clone(), observer)
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    // Exactly three files landed; the rest were never attempted.
    let job_dir = fixture.destination.join("big-import");
    assert_eq!(fixture.file_count_under(&job_dir), 3);
    assert_eq!(recorder.progress().len(), 3);
    assert_eq!(
        recorder.states(),
        vec![JobState::Queued, JobState::Running, JobState::Cancelled]
    );
    assert!(!recorder.completed(), "no completion after cancel");
    assert!(recorder.errors().is_empty(), "cancellation is not an error");
    assert!(worker.list_jobs().is_empty());
}

#[tokio::test]
async fn missing_source_file_fails_the_job_and_keeps_partial_copies() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let good = fixture.create_file("card/good.jpg", "ok");
    let missing = fixture.destination.join("nowhere/gone.jpg");

    let worker = CopyWorker::new();
    let observer = Arc::new(RecordingObserver::default());
    let handle = worker
        .start_copy(
            "doomed",
            vec![good, missing],
            fixture.destination.clone(),
            observer.clone(),
        )
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    assert_eq!(
        observer.states(),
        vec![JobState::Queued, JobState::Running, JobState::Failed]
    );
    let errors = observer.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("gone.jpg"), "error names the path: {}", errors[0]);

    // The file copied before the failure is not rolled back.
    assert!(fixture
        .destination
        .join("doomed")
        .join("jpg")
        .join("good.jpg")
        .exists());
    assert!(worker.list_jobs().is_empty(), "failed job evicted");
}

#[tokio::test]
async fn cancel_of_unknown_or_finished_job_returns_false() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let file = fixture.create_file("card/a.jpg", "a");

    let worker = CopyWorker::new();
    assert!(!worker.cancel("never-started"));

    let handle = worker
        .start_copy(
            "quick",
            vec![file],
            fixture.destination.clone(),
            Arc::new(NullObserver),
        )
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    // Evicted on completion, so cancellation has nothing to target.
    assert!(!worker.cancel("quick"));
}

#[tokio::test]
async fn controller_forwards_copy_callbacks_as_events() {
    setup_test_logging();
    let fixture = CopyFixture::new();
    let a = fixture.create_file("card/a.jpg", "a");
    let b = fixture.create_file("card/b.nef", "b");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let controller = CopyController::new(event_tx);
    let handle = controller
        .start_copy("trip", vec![a, b], fixture.destination.clone())
        .expect("job starts");
    handle.join().await.expect("worker finishes");

    let mut progress = Vec::new();
    let mut completed = false;
    while let Ok(event) = event_rx.try_recv() {
        match event {
            OrganizerEvent::CopyProgress { job, current, total } => {
                assert_eq!(job, "trip");
                progress.push((current, total));
            }
            OrganizerEvent::CopyCompleted { job } => {
                assert_eq!(job, "trip");
                completed = true;
            }
            OrganizerEvent::CopyStateChanged { job, .. } => assert_eq!(job, "trip"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(progress, vec![(1, 2), (2, 2)]);
    assert!(completed);
}
