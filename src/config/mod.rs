pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::DateSource;

fn default_preview_count() -> usize {
    10
}

/// Persisted application settings. The core only consumes these; it never
/// writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Last folder scanned for media.
    #[serde(default)]
    pub last_source_folder: String,
    /// Last folder copy jobs were written into.
    #[serde(default)]
    pub last_target_folder: String,
    /// How many images a date-group preview shows.
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
    /// Which timestamp drives date grouping.
    #[serde(default)]
    pub date_source: DateSource,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_source_folder: String::new(),
            last_target_folder: String::new(),
            preview_count: default_preview_count(),
            date_source: DateSource::Filesystem,
        }
    }
}
