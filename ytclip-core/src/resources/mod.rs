//! Provisioning of the external tools the app drives.
//!
//! On Windows the app ships without FFmpeg and yt-dlp and fetches pinned
//! releases into its own resource directory on first start. Elsewhere both
//! tools are expected on the search path and nothing is installed.
//!
//! # Architecture
//!
//! - `types`: Core types (ToolId, Platform, ToolLocation, InstallTarget)
//! - `catalog`: Pinned download URLs and install layout per tool
//! - `fetcher`: HTTP download with polled progress
//! - `extractor`: Archive extraction (zip, tar.gz)
//! - `installer`: Idempotent per-tool installation
//! - `setup`: Runs every installer concurrently
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ytclip_core::{AppPaths, Settings, Setup, TracingSink};
//!
//! let paths = AppPaths::resolve();
//! let settings = Settings::load(&paths.settings_path());
//! Setup::new(paths, &settings, Arc::new(TracingSink)).install().await?;
//! ```

pub mod catalog;
pub mod extractor;
pub mod fetcher;
pub mod installer;
pub mod setup;
pub mod types;

pub use catalog::{all_install_targets, install_target};
pub use extractor::{extract, extract_archive, make_executable};
pub use fetcher::{FetchProgress, Fetcher, UrlPolicy};
pub use installer::{TargetInstaller, ToolInstaller};
pub use setup::Setup;
pub use types::{ArchiveFormat, InstallTarget, Platform, ToolId, ToolLocation};
