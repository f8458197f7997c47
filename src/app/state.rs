//! Defines the caller-owned state the scan results are applied to.

use std::path::PathBuf;

use crate::core::DateGroups;

/// Image extensions eligible for thumbnail previews (videos excluded).
const PREVIEW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];

/// The applied scan state: which source folder is loaded and which files
/// belong to which date.
///
/// Workers never touch this struct. A finished scan hands its grouping to
/// the caller, which applies it here on its own context; that is what
/// keeps concurrent rescans race-free. Group removal and restoration are
/// likewise caller-driven: a group is removed when its files are queued
/// for copying and restored if that copy job later fails or is cancelled.
#[derive(Debug, Default)]
pub struct OrganizerState {
    source_folder: Option<PathBuf>,
    files_by_date: DateGroups,
}

impl OrganizerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_folder(&self) -> Option<&PathBuf> {
        self.source_folder.as_ref()
    }

    /// Replaces the state with a freshly produced scan result.
    pub fn apply_scan_results(&mut self, source_folder: PathBuf, files_by_date: DateGroups) {
        self.source_folder = Some(source_folder);
        self.files_by_date = files_by_date;
    }

    /// Date keys, ascending.
    pub fn date_groups(&self) -> Vec<&str> {
        self.files_by_date.keys().map(String::as_str).collect()
    }

    pub fn files_for_date(&self, date: &str) -> &[PathBuf] {
        self.files_by_date
            .get(date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn file_count(&self, date: &str) -> usize {
        self.files_for_date(date).len()
    }

    /// The first `limit` image files of a group, for preview rendering.
    pub fn image_files_for_preview(&self, date: &str, limit: usize) -> Vec<&PathBuf> {
        self.files_for_date(date)
            .iter()
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        let ext = ext.to_lowercase();
                        PREVIEW_EXTENSIONS.contains(&ext.as_str())
                    })
                    .unwrap_or(false)
            })
            .take(limit)
            .collect()
    }

    /// Removes a date group, returning its files so they can be queued
    /// for a copy job.
    pub fn remove_group(&mut self, date: &str) -> Option<Vec<PathBuf>> {
        self.files_by_date.remove(date)
    }

    /// Puts a previously removed group back, the compensating action after
    /// a failed or cancelled copy. If a rescan re-created the group in the
    /// meantime the files are merged instead.
    pub fn restore_group(&mut self, date: impl Into<String>, files: Vec<PathBuf>) {
        let entry = self.files_by_date.entry(date.into()).or_default();
        entry.extend(files);
        entry.sort();
        entry.dedup();
    }
}
