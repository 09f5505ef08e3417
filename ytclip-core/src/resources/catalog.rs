//! Tool catalog with hardcoded definitions.
//!
//! Download URLs are version-pinned at build time and are not configurable.

use crate::config::AppPaths;

use super::types::{ArchiveFormat, InstallTarget, ToolId};

// ============================================================================
// FFmpeg Definition
// ============================================================================

/// Top-level directory inside the pinned FFmpeg archive.
pub const FFMPEG_BUILD: &str = "ffmpeg-N-116752-g507c2a5774-win64-gpl";

pub const FFMPEG_EXE: &str = "ffmpeg.exe";

pub const FFMPEG_URL: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/autobuild-2024-08-20-13-02/ffmpeg-N-116752-g507c2a5774-win64-gpl.zip";

// ============================================================================
// yt-dlp Definition
// ============================================================================

pub const YT_DLP_EXE: &str = "yt-dlp.exe";

pub const YT_DLP_URL: &str =
    "https://github.com/yt-dlp/yt-dlp/releases/download/2024.05.27/yt-dlp.exe";

// ============================================================================
// Lookup Functions
// ============================================================================

/// Returns the pinned download URL for a tool.
pub fn download_url(tool: ToolId) -> &'static str {
    match tool {
        ToolId::Ffmpeg => FFMPEG_URL,
        ToolId::YtDlp => YT_DLP_URL,
    }
}

/// Builds the install target for `tool` under the given layout.
///
/// FFmpeg arrives as a zip in the download dir and is extracted into
/// `resources/ffmpeg/`. yt-dlp is a single executable fetched straight to
/// its final path.
pub fn install_target(tool: ToolId, paths: &AppPaths) -> InstallTarget {
    let url = download_url(tool);
    let install_dir = paths.tool_dir(tool);
    let location = paths.tool_location(tool);

    match tool {
        ToolId::Ffmpeg => {
            let archive = ArchiveFormat::from_url(url);
            let file_name = match archive {
                Some(format) => format!("ffmpeg.{}", format.extension()),
                None => "ffmpeg.download".to_string(),
            };
            InstallTarget {
                tool,
                url: url.to_string(),
                location,
                install_dir,
                fetch_path: paths.download_dir().join(file_name),
                archive,
            }
        }
        ToolId::YtDlp => InstallTarget {
            tool,
            url: url.to_string(),
            location,
            fetch_path: install_dir.join(YT_DLP_EXE),
            install_dir,
            archive: None,
        },
    }
}

/// Builds install targets for every managed tool.
pub fn all_install_targets(paths: &AppPaths) -> Vec<InstallTarget> {
    ToolId::all()
        .iter()
        .map(|tool| install_target(*tool, paths))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::types::{Platform, ToolLocation};

    #[test]
    fn test_urls_are_pinned_github_releases() {
        for tool in ToolId::all() {
            let url = download_url(*tool);
            assert!(url.starts_with("https://github.com/"), "{url}");
            assert!(url.contains("/releases/download/"), "{url}");
        }
    }

    #[test]
    fn test_ffmpeg_target_is_zip_in_download_dir() {
        let paths = AppPaths::at("/h/.ytdlp", Platform::Windows);
        let target = install_target(ToolId::Ffmpeg, &paths);

        assert_eq!(target.archive, Some(ArchiveFormat::Zip));
        assert!(target.requires_extraction());
        assert_eq!(target.fetch_path, paths.download_dir().join("ffmpeg.zip"));
        assert_eq!(target.install_dir, paths.resource_dir().join("ffmpeg"));
        assert_eq!(target.location, paths.ffmpeg_location());
    }

    #[test]
    fn test_ytdlp_target_fetches_binary_directly() {
        let paths = AppPaths::at("/h/.ytdlp", Platform::Windows);
        let target = install_target(ToolId::YtDlp, &paths);

        assert!(!target.requires_extraction());
        assert_eq!(target.install_dir, paths.resource_dir().join("yt-dlp"));
        assert_eq!(
            target.location,
            ToolLocation::Managed(target.fetch_path.clone())
        );
    }

    #[test]
    fn test_non_windows_targets_use_search_path() {
        let paths = AppPaths::at("/h/.ytdlp", Platform::Linux);
        for target in all_install_targets(&paths) {
            assert!(matches!(target.location, ToolLocation::SearchPath(_)));
        }
    }

    #[test]
    fn test_all_install_targets() {
        let paths = AppPaths::at("/h/.ytdlp", Platform::Windows);
        let targets = all_install_targets(&paths);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].tool, ToolId::Ffmpeg);
        assert_eq!(targets[1].tool, ToolId::YtDlp);
    }
}
