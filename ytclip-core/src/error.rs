//! Error types shared by the provisioning and clip download layers.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout `ytclip-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while provisioning tools or downloading clips.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("No usable Content-Length reported by {url}")]
    MissingContentLength { url: String },

    #[error("Failed to read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Invalid file path in archive: {0}")]
    UnsafeEntry(String),

    #[error("Extract entry {entry} error: {source}")]
    Entry {
        entry: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Process { program: String, status: ExitStatus },

    #[error("Invalid clip section: {0}")]
    InvalidSection(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{task} task failed: {reason}")]
    TaskFailed { task: String, reason: String },
}

impl Error {
    /// Builds a closure mapping an `io::Error` into [`Error::Io`] for `path`.
    pub(crate) fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Error {
        let path = path.to_path_buf();
        move |source| Error::Io {
            action,
            path,
            source,
        }
    }

    /// Wraps a per-entry failure with the entry name.
    pub(crate) fn in_entry(self, entry: impl Into<String>) -> Error {
        Error::Entry {
            entry: entry.into(),
            source: Box::new(self),
        }
    }
}
