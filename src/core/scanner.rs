//! The scan coordinator: walks a source tree and groups camera media by date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::dates::{resolve_date, DateSource};
use super::error::CoreError;

/// Date string (`YYYY-MM-DD`) → files assigned to that date, path-sorted.
/// The map is ordered, so iterating yields dates ascending.
pub type DateGroups = BTreeMap<String, Vec<PathBuf>>;

/// The fixed allowlist of camera media extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif",
    // RAW formats
    "nef", "cr2", "cr3", "arw", "dng", "raw", "orf",
    // Videos
    "mp4", "mov", "avi", "mkv", "m4v",
];

/// How many entries to enumerate between yields back to the runtime.
const ENUMERATION_YIELD_INTERVAL: usize = 64;
/// How many files to date-resolve between yields.
const RESOLVE_YIELD_INTERVAL: usize = 25;

/// Returns `true` if the extension is on the media allowlist.
pub fn is_supported_media(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Walks a source directory and produces the date → files grouping.
///
/// The scanner mutates no shared state; it returns the grouping by value
/// and the caller decides when and whether to apply it (see the request
/// sequencer for the stale-result rules).
pub struct SourceScanner {
    date_source: DateSource,
}

impl SourceScanner {
    pub fn new(date_source: DateSource) -> Self {
        Self { date_source }
    }

    pub fn date_source(&self) -> DateSource {
        self.date_source
    }

    /// Scans `root`, reporting progress as `(files_processed, total)`.
    ///
    /// The total is known once enumeration finishes; the first progress
    /// call is `(0, total)` and each grouped file adds one. Files whose
    /// date cannot be resolved are skipped, not errors. A tripped cancel
    /// flag surfaces as [`CoreError::Cancelled`], which is an outcome
    /// distinct from failure.
    pub async fn scan_with_progress<F>(
        &self,
        root: &Path,
        cancel_flag: Arc<AtomicBool>,
        progress_callback: F,
    ) -> Result<DateGroups, CoreError>
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        if !root.is_dir() {
            return Err(CoreError::NotADirectory(root.to_path_buf()));
        }
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CoreError::Cancelled);
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if cancel_flag.load(Ordering::Relaxed) {
                tracing::info!(
                    "Scan of {} cancelled during enumeration after {} candidates",
                    root.display(),
                    candidates.len()
                );
                return Err(CoreError::Cancelled);
            }
            if !entry.file_type().is_file() || !is_supported_media(entry.path()) {
                continue;
            }
            candidates.push(entry.into_path());

            if candidates.len() % ENUMERATION_YIELD_INTERVAL == 0 {
                tokio::task::yield_now().await;
            }
        }

        let total = candidates.len();
        tracing::info!("Found {} media files under {}", total, root.display());
        progress_callback(0, total);

        let mut groups: DateGroups = BTreeMap::new();
        let mut processed = 0;

        for (idx, file) in candidates.into_iter().enumerate() {
            if cancel_flag.load(Ordering::Relaxed) {
                tracing::info!("Scan of {} cancelled at file {}/{}", root.display(), idx, total);
                return Err(CoreError::Cancelled);
            }

            let Some(date) = resolve_date(&file, self.date_source) else {
                tracing::debug!("No date resolved for {}, excluding", file.display());
                continue;
            };
            groups.entry(date).or_default().push(file);

            processed += 1;
            progress_callback(processed, total);

            if (idx + 1) % RESOLVE_YIELD_INTERVAL == 0 {
                tokio::task::yield_now().await;
            }
        }

        for files in groups.values_mut() {
            files.sort();
        }

        tracing::info!(
            "Scan of {} completed: {} files in {} date groups",
            root.display(),
            processed,
            groups.len()
        );
        Ok(groups)
    }
}
