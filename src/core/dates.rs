//! Date-resolution policy for grouping media files.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use super::metadata;

/// Where a file's grouping date comes from.
///
/// `Metadata` prefers the embedded capture date and falls back to the
/// filesystem timestamp when the container has none or it is unreadable.
/// Persisted as configuration, never computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    #[default]
    Filesystem,
    Metadata,
}

impl DateSource {
    /// Resolves a persisted value, falling back to `Filesystem` for
    /// anything unrecognized so a stale config never breaks startup.
    pub fn from_value(value: &str) -> Self {
        match value {
            "metadata" => DateSource::Metadata,
            _ => DateSource::Filesystem,
        }
    }
}

/// Lenient by design: an unrecognized policy string degrades to the
/// default instead of failing the surrounding document, so one stale
/// value cannot invalidate the rest of a persisted config.
impl<'de> Deserialize<'de> for DateSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(DateSource::from_value(&value))
    }
}

/// Determines the `YYYY-MM-DD` grouping date for a file, or `None` when no
/// date can be derived (the file is then excluded from all groups).
pub fn resolve_date(path: &Path, source: DateSource) -> Option<String> {
    if source == DateSource::Metadata && metadata::supports_embedded_metadata(path) {
        if let Some(date) = metadata::capture_date(path) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    filesystem_date(path)
}

/// Calendar date from filesystem timestamps, in local time.
///
/// On Windows `created()` is the true creation time. On Unix the ctime is
/// the inode change time, not creation, so the modification time is the
/// meaningful signal and is what we expose.
pub fn filesystem_date(path: &Path) -> Option<String> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::debug!("Failed to stat {}: {}", path.display(), err);
            return None;
        }
    };

    let timestamp = if cfg!(windows) {
        meta.created().or_else(|_| meta.modified())
    } else {
        meta.modified()
    };

    match timestamp {
        Ok(time) => {
            let local: DateTime<Local> = time.into();
            Some(local.format("%Y-%m-%d").to_string())
        }
        Err(err) => {
            tracing::debug!("Failed to read timestamp for {}: {}", path.display(), err);
            None
        }
    }
}
