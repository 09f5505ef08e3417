//! Configuration module for ytclip.
//!
//! Holds the resolved directory layout and the user settings file.

pub mod paths;
mod settings;

pub use paths::AppPaths;
pub use settings::{Settings, DEFAULT_FORMAT_SORT, DEFAULT_POLL_INTERVAL_MS};
