//! Core types for tool provisioning.
//!
//! Tool identifiers, platform detection, where a tool binary lives, archive
//! formats and the per-tool install target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

// ============================================================================
// Tool Identifiers
// ============================================================================

/// The external tools the application depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolId {
    /// FFmpeg - used by yt-dlp to cut sections at keyframes.
    #[serde(rename = "ffmpeg")]
    Ffmpeg,
    /// yt-dlp - the video downloader.
    #[serde(rename = "yt-dlp")]
    YtDlp,
}

impl ToolId {
    /// Returns all managed tool IDs.
    pub fn all() -> &'static [ToolId] {
        &[Self::Ffmpeg, Self::YtDlp]
    }

    /// Returns the event key for this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::YtDlp => "yt-dlp",
        }
    }

    /// Returns the human-readable title shown in progress events.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "FFmpeg",
            Self::YtDlp => "yt-dlp",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ffmpeg" => Ok(Self::Ffmpeg),
            "yt-dlp" | "ytdlp" => Ok(Self::YtDlp),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Operating system family the binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    Macos,
    Linux,
    Other,
}

impl Platform {
    /// Returns the platform of the running build.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Returns true if tool binaries are downloaded and owned by the app.
    ///
    /// Only Windows builds ship managed binaries; everywhere else the tools
    /// are expected on the search path.
    pub fn manages_tools(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Macos => "macOS",
            Self::Linux => "Linux",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Tool Location
// ============================================================================

/// Where a tool binary is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// App-owned binary at a deterministic path under the resource dir.
    Managed(PathBuf),
    /// Binary name looked up on the system search path.
    SearchPath(&'static str),
}

impl ToolLocation {
    /// Returns the program to pass to a process spawner.
    pub fn program(&self) -> &OsStr {
        match self {
            Self::Managed(path) => path.as_os_str(),
            Self::SearchPath(name) => OsStr::new(name),
        }
    }

    /// Returns the managed path, if any.
    pub fn managed_path(&self) -> Option<&Path> {
        match self {
            Self::Managed(path) => Some(path),
            Self::SearchPath(_) => None,
        }
    }
}

// ============================================================================
// Archive Format
// ============================================================================

/// Archive format of a downloaded tool package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip)
    Zip,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

// ============================================================================
// Install Target
// ============================================================================

/// Everything an installer needs to provision one tool.
#[derive(Debug, Clone)]
pub struct InstallTarget {
    /// Which tool this is.
    pub tool: ToolId,
    /// Version-pinned download URL.
    pub url: String,
    /// Where the finished binary lives.
    pub location: ToolLocation,
    /// Directory created before fetching; extraction destination.
    pub install_dir: PathBuf,
    /// Where the fetched bytes land.
    pub fetch_path: PathBuf,
    /// Set when the fetched file has to be extracted.
    pub archive: Option<ArchiveFormat>,
}

impl InstallTarget {
    /// Returns true if the fetched file is an archive.
    pub fn requires_extraction(&self) -> bool {
        self.archive.is_some()
    }
}
