//! Application directory layout.
//!
//! Everything the application writes lives under a single per-user home:
//!
//! - `~/.ytdlp/download/`  - fetched archives
//! - `~/.ytdlp/resources/` - managed tool binaries
//! - `~/.ytdlp/temp/`      - scratch space
//!
//! The layout is resolved once into an [`AppPaths`] value and handed to every
//! component that needs it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::resources::catalog::{FFMPEG_BUILD, FFMPEG_EXE, YT_DLP_EXE};
use crate::resources::types::{Platform, ToolLocation, ToolId};

/// Directory name under the user's home.
const APP_HOME_DIR: &str = ".ytdlp";

/// Resolved filesystem locations for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    home: PathBuf,
    platform: Platform,
}

impl AppPaths {
    /// Resolves the layout for the current user and platform.
    ///
    /// Falls back to the OS temp directory when the user home is unknown.
    pub fn resolve() -> Self {
        let base = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self::at(base.join(APP_HOME_DIR), Platform::current())
    }

    /// Uses an explicit home directory and platform.
    pub fn at(home: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            home: home.into(),
            platform,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Path: `{home}/download/`
    pub fn download_dir(&self) -> PathBuf {
        self.home.join("download")
    }

    /// Path: `{home}/resources/`
    pub fn resource_dir(&self) -> PathBuf {
        self.home.join("resources")
    }

    /// Path: `{home}/temp/`
    pub fn temp_dir(&self) -> PathBuf {
        self.home.join("temp")
    }

    /// Path: `{home}/settings.json`
    pub fn settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }

    /// Directory a managed tool is installed into.
    ///
    /// Path: `{home}/resources/{tool}/`
    pub fn tool_dir(&self, tool: ToolId) -> PathBuf {
        self.resource_dir().join(tool.as_str())
    }

    /// Location of the FFmpeg binary.
    ///
    /// - Windows: `{home}/resources/ffmpeg/<build>/bin/ffmpeg.exe`
    /// - elsewhere: `ffmpeg` on the search path
    pub fn ffmpeg_location(&self) -> ToolLocation {
        if self.platform.manages_tools() {
            ToolLocation::Managed(
                self.tool_dir(ToolId::Ffmpeg)
                    .join(FFMPEG_BUILD)
                    .join("bin")
                    .join(FFMPEG_EXE),
            )
        } else {
            ToolLocation::SearchPath("ffmpeg")
        }
    }

    /// Location of the yt-dlp binary.
    ///
    /// - Windows: `{home}/resources/yt-dlp/yt-dlp.exe`
    /// - elsewhere: `yt-dlp` on the search path
    pub fn ytdlp_location(&self) -> ToolLocation {
        if self.platform.manages_tools() {
            ToolLocation::Managed(self.tool_dir(ToolId::YtDlp).join(YT_DLP_EXE))
        } else {
            ToolLocation::SearchPath("yt-dlp")
        }
    }

    /// Location of any managed tool.
    pub fn tool_location(&self, tool: ToolId) -> ToolLocation {
        match tool {
            ToolId::Ffmpeg => self.ffmpeg_location(),
            ToolId::YtDlp => self.ytdlp_location(),
        }
    }

    /// Ensures the download, resource and temp directories exist.
    ///
    /// # Errors
    ///
    /// Returns the first directory that cannot be created.
    pub fn ensure_dirs_exist(&self) -> Result<()> {
        for dir in [self.download_dir(), self.resource_dir(), self.temp_dir()] {
            std::fs::create_dir_all(&dir).map_err(Error::io("create directory", &dir))?;
        }
        Ok(())
    }
}
