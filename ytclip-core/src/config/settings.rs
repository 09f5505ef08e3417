//! Application settings for ytclip.
//!
//! Settings are persisted as JSON next to the other application data.
//! Tool download URLs are deliberately not part of the settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resources::fetcher::UrlPolicy;

// =============================================================================
// Defaults
// =============================================================================

/// Default interval between progress samples while fetching.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default yt-dlp format sort (`-S`).
pub const DEFAULT_FORMAT_SORT: &str = "res:480,fps";

const MIN_POLL_INTERVAL_MS: u64 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 10_000;

// =============================================================================
// Application Settings
// =============================================================================

/// Application settings - persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Milliseconds between progress samples during a fetch.
    pub poll_interval_ms: u64,

    /// Where finished clips are written. `None` means `<Downloads>/ytdlp`.
    pub output_dir: Option<PathBuf>,

    /// Format sort passed to yt-dlp.
    pub format_sort: String,

    /// Hosts tool downloads may come from (subdomains included).
    pub allowed_download_domains: Vec<String>,

    /// Reject plain-HTTP tool downloads.
    pub require_https: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            output_dir: None,
            format_sort: DEFAULT_FORMAT_SORT.to_string(),
            allowed_download_domains: vec!["github.com".to_string()],
            require_https: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`, using defaults for missing values.
    ///
    /// If the file doesn't exist or can't be parsed, returns defaults.
    pub fn load(path: &Path) -> Self {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Settings>(&json) {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to read settings, using defaults");
                Self::default()
            }
        };

        settings.validate();
        settings
    }

    /// Save settings to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::io("create directory", parent))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Io {
            action: "serialize settings for",
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        std::fs::write(path, json).map_err(Error::io("write", path))?;
        Ok(())
    }

    /// Validate and clamp settings to valid ranges.
    pub fn validate(&mut self) {
        self.poll_interval_ms = self
            .poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);

        if self.format_sort.trim().is_empty() {
            self.format_sort = DEFAULT_FORMAT_SORT.to_string();
        }
    }

    /// Interval between progress samples.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Directory finished clips are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::download_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
                .unwrap_or_else(std::env::temp_dir)
                .join("ytdlp")
        })
    }

    /// Download URL policy derived from these settings.
    pub fn url_policy(&self) -> UrlPolicy {
        UrlPolicy {
            require_https: self.require_https,
            allowed_domains: self.allowed_download_domains.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
