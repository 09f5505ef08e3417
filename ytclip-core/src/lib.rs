//! ytclip Core Library
//!
//! This crate provides the core functionality for ytclip, a small app that
//! cuts sections out of online videos with yt-dlp and FFmpeg. It includes:
//!
//! - Resolution of the per-user data directory and tool locations
//! - On-demand provisioning of pinned FFmpeg and yt-dlp releases
//! - Archive extraction and HTTP fetching with progress reporting
//! - Clip downloads driven through yt-dlp
//! - Events for a UI layer to observe all of the above

pub mod clip;
pub mod config;
pub mod error;
pub mod events;
pub mod resources;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::{AppPaths, Settings};
pub use error::{Error, Result};

// Re-export events
pub use events::{
    event_channel, AppEvent, EventReceiver, EventSender, EventSink, MessageStatus, TracingSink,
};

// Re-export provisioning
pub use resources::{Fetcher, Platform, Setup, TargetInstaller, ToolId, ToolInstaller, UrlPolicy};

// Re-export clip downloads
pub use clip::{ClipDownloader, ClipRequest, Section};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
