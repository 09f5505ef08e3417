//! Per-tool installation.
//!
//! A [`TargetInstaller`] makes one [`InstallTarget`] present on disk. It is
//! idempotent: a binary that already exists is left alone and no network
//! traffic happens.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::AppPaths;
use crate::error::{Error, Result};
use crate::events::{EventSink, ResourceReporter};

use super::catalog;
use super::extractor::{self, make_executable};
use super::fetcher::{FetchProgress, Fetcher};
use super::types::{InstallTarget, Platform, ToolId, ToolLocation};

/// Something that can make a tool available.
#[async_trait]
pub trait ToolInstaller: Send + Sync {
    /// Which tool this installs.
    fn tool(&self) -> ToolId;

    /// Ensures the tool is installed.
    ///
    /// Emits resource events only when an installation actually runs.
    async fn setup(&self) -> Result<()>;
}

/// Installs a catalog target by fetching and, if needed, extracting it.
pub struct TargetInstaller {
    target: InstallTarget,
    fetcher: Arc<Fetcher>,
    sink: Arc<dyn EventSink>,
    platform: Platform,
}

impl TargetInstaller {
    pub fn new(
        target: InstallTarget,
        fetcher: Arc<Fetcher>,
        sink: Arc<dyn EventSink>,
        platform: Platform,
    ) -> Self {
        Self {
            target,
            fetcher,
            sink,
            platform,
        }
    }

    /// Installer for a catalog tool under `paths`.
    pub fn for_tool(
        tool: ToolId,
        paths: &AppPaths,
        fetcher: Arc<Fetcher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(
            catalog::install_target(tool, paths),
            fetcher,
            sink,
            paths.platform(),
        )
    }

    pub fn target(&self) -> &InstallTarget {
        &self.target
    }

    async fn provision(&self, reporter: &ResourceReporter<'_>, binary: &Path) -> Result<()> {
        let target = &self.target;

        tokio::fs::create_dir_all(&target.install_dir)
            .await
            .map_err(Error::io("create directory", &target.install_dir))?;

        // Leftover from an interrupted run.
        if tokio::fs::try_exists(&target.fetch_path).await.unwrap_or(false) {
            debug!("Removing stale download {}", target.fetch_path.display());
            tokio::fs::remove_file(&target.fetch_path)
                .await
                .map_err(Error::io("remove", &target.fetch_path))?;
        }

        self.fetcher
            .fetch(&target.url, &target.fetch_path, |progress: FetchProgress| {
                reporter.progress("Downloading", progress.percent)
            })
            .await?;

        if let Some(format) = target.archive {
            reporter.progress("Extracting", 0.0);
            extractor::extract(&target.fetch_path, &target.install_dir, format, self.platform)
                .await?;

            if let Err(e) = tokio::fs::remove_file(&target.fetch_path).await {
                warn!("Failed to clean up archive: {}", e);
            }
        }

        if !tokio::fs::try_exists(binary).await.unwrap_or(false) {
            return Err(Error::Io {
                action: "locate installed binary",
                path: binary.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            });
        }

        make_executable(binary)
    }
}

#[async_trait]
impl ToolInstaller for TargetInstaller {
    fn tool(&self) -> ToolId {
        self.target.tool
    }

    async fn setup(&self) -> Result<()> {
        let tool = self.target.tool;

        let binary = match &self.target.location {
            ToolLocation::SearchPath(program) => {
                debug!("{} resolved from the search path as {}", tool.title(), program);
                return Ok(());
            }
            ToolLocation::Managed(path) => path,
        };

        match tokio::fs::try_exists(binary).await {
            Ok(true) => {
                info!("{} already exists at {}", tool.title(), binary.display());
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => warn!("Could not check {}: {}", binary.display(), e),
        }

        info!("Installing {} from {}", tool.title(), self.target.url);

        let reporter = ResourceReporter::new(self.sink.as_ref(), tool);
        reporter.start();

        match self.provision(&reporter, binary).await {
            Ok(()) => {
                reporter.stop();
                info!("{} installed at {}", tool.title(), binary.display());
                Ok(())
            }
            Err(e) => {
                reporter.error(e.to_string());
                Err(e)
            }
        }
    }
}
