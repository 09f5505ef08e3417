//! Clip downloads through yt-dlp.
//!
//! A clip is a section of a video, cut at keyframes by yt-dlp with FFmpeg's
//! help. Progress is read from yt-dlp's `--newline` output and forwarded to
//! the event sink.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppPaths, Settings};
use crate::error::{Error, Result};
use crate::events::{AppEvent, DownloadProgress, DownloadStatus, EventSink};
use crate::resources::types::{ToolId, ToolLocation};

/// Hides the console window yt-dlp would otherwise open on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

// ============================================================================
// Request Types
// ============================================================================

/// Time range to cut, in any format yt-dlp accepts (`90`, `1:30`, `00:01:30`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub start: String,
    pub end: String,
}

impl Section {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let section = Self {
            start: start.into().trim().to_string(),
            end: end.into().trim().to_string(),
        };
        section.validate()?;
        Ok(section)
    }

    fn validate(&self) -> Result<()> {
        if self.start.is_empty() {
            return Err(Error::InvalidSection("start is empty".to_string()));
        }
        if self.end.is_empty() {
            return Err(Error::InvalidSection("end is empty".to_string()));
        }
        Ok(())
    }

    /// Value for `--download-sections`.
    pub fn download_sections(&self) -> String {
        format!("*{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub url: String,
    pub section: Section,
}

impl ClipRequest {
    pub fn new(url: impl Into<String>, section: Section) -> Self {
        Self {
            url: url.into(),
            section,
        }
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// Runs yt-dlp for clip requests.
#[derive(Debug, Clone)]
pub struct ClipDownloader {
    program: OsString,
    ffmpeg: ToolLocation,
    output_dir: PathBuf,
    format_sort: String,
}

impl ClipDownloader {
    pub fn new(paths: &AppPaths, settings: &Settings) -> Self {
        Self {
            program: paths.tool_location(ToolId::YtDlp).program().to_os_string(),
            ffmpeg: paths.tool_location(ToolId::Ffmpeg),
            output_dir: settings.output_dir(),
            format_sort: settings.format_sort.clone(),
        }
    }

    /// Overrides the yt-dlp executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Builds the yt-dlp argument list for `request`.
    ///
    /// `--ffmpeg-location` is only passed for a managed FFmpeg; a search-path
    /// FFmpeg is found by yt-dlp on its own.
    pub fn args(&self, request: &ClipRequest) -> Result<Vec<OsString>> {
        request.section.validate()?;
        if request.url.trim().is_empty() {
            return Err(Error::InvalidUrl {
                url: request.url.clone(),
                reason: "URL is empty".to_string(),
            });
        }

        let output = self
            .output_dir
            .join("%(extractor)s")
            .join("%(id)s.%(ext)s");

        let mut args: Vec<OsString> = vec![
            "--download-sections".into(),
            request.section.download_sections().into(),
            "--force-keyframes-at-cuts".into(),
            request.url.trim().into(),
            "--force-overwrites".into(),
            "-S".into(),
            self.format_sort.clone().into(),
            "--output".into(),
            output.into_os_string(),
        ];

        if let Some(ffmpeg) = self.ffmpeg.managed_path() {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_os_string());
        }

        args.push("--newline".into());
        Ok(args)
    }

    /// Downloads one clip.
    ///
    /// `download-stop` is emitted on every path out of this function,
    /// including an already-cancelled token.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `cancel` fires before or during the download.
    /// - The request is invalid.
    /// - yt-dlp cannot be launched or exits unsuccessfully.
    pub async fn download(
        &self,
        request: &ClipRequest,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let result = self.run(request, cancel, sink).await;

        match &result {
            Ok(()) => {
                info!("Download finished: {}", request.url);
                emit_progress(sink, DownloadStatus::Done, Some(100.0));
            }
            Err(Error::Cancelled) => info!("Download cancelled: {}", request.url),
            Err(e) => {
                warn!("Download failed: {}", e);
                emit_progress(sink, DownloadStatus::Error, None);
            }
        }

        sink.emit(AppEvent::DownloadStop);
        result
    }

    async fn run(
        &self,
        request: &ClipRequest,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let args = self.args(request)?;

        info!(
            url = %request.url,
            section = %request.section.download_sections(),
            output = %self.output_dir.display(),
            "Starting clip download"
        );

        sink.emit(AppEvent::DownloadStart);
        emit_progress(sink, DownloadStatus::Pending, None);

        run_process(&self.program, &args, cancel, sink).await
    }
}

/// Runs `program` to completion, forwarding stdout progress lines.
///
/// The child is killed if `cancel` fires first.
async fn run_process(
    program: &OsStr,
    args: &[OsString],
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) -> Result<()> {
    let program_name = program.to_string_lossy().to_string();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        program: program_name.clone(),
        source,
    })?;

    let stdout = child.stdout.take();

    // Owns the child so that dropping it on cancellation kills the process.
    let monitor = async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp: {}", line);
                if let Some(progress) = parse_line(&line) {
                    sink.emit(AppEvent::DownloadProgress(progress));
                }
            }
        }
        child.wait().await
    };

    let status = tokio::select! {
        status = monitor => status.map_err(|source| Error::Spawn {
            program: program_name.clone(),
            source,
        })?,
        _ = cancel.cancelled() => {
            info!("Cancellation requested, killing {}", program_name);
            return Err(Error::Cancelled);
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(Error::Process {
            program: program_name,
            status,
        })
    }
}

fn emit_progress(sink: &dyn EventSink, status: DownloadStatus, progress: Option<f64>) {
    sink.emit(AppEvent::DownloadProgress(DownloadProgress { status, progress }));
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("progress pattern is valid")
    })
}

/// Postprocessor prefixes yt-dlp prints once downloading is over.
const PROCESSING_PREFIXES: &[&str] = &["[Merger]", "[ffmpeg]", "[Fixup", "[VideoConvertor]"];

/// Maps one line of yt-dlp output to a progress update.
fn parse_line(line: &str) -> Option<DownloadProgress> {
    let line = line.trim();

    if let Some(caps) = percent_regex().captures(line) {
        let percent = caps[1].parse::<f64>().ok()?;
        return Some(DownloadProgress {
            status: DownloadStatus::Download,
            progress: Some(percent),
        });
    }

    if PROCESSING_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return Some(DownloadProgress {
            status: DownloadStatus::Processing,
            progress: None,
        });
    }

    None
}
