//! Concurrent provisioning of every tool.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

use crate::config::{AppPaths, Settings};
use crate::error::{Error, Result};
use crate::events::EventSink;

use super::fetcher::Fetcher;
use super::installer::{TargetInstaller, ToolInstaller};
use super::types::ToolId;

/// Runs all tool installers at once and waits for every one of them.
pub struct Setup {
    paths: AppPaths,
    installers: Vec<Arc<dyn ToolInstaller>>,
}

impl Setup {
    /// Builds installers for every catalog tool, sharing one fetcher.
    pub fn new(paths: AppPaths, settings: &Settings, sink: Arc<dyn EventSink>) -> Self {
        let fetcher = Arc::new(Fetcher::new(settings));
        let installers = ToolId::all()
            .iter()
            .map(|tool| {
                Arc::new(TargetInstaller::for_tool(
                    *tool,
                    &paths,
                    fetcher.clone(),
                    sink.clone(),
                )) as Arc<dyn ToolInstaller>
            })
            .collect();

        Self { paths, installers }
    }

    pub fn with_installers(paths: AppPaths, installers: Vec<Arc<dyn ToolInstaller>>) -> Self {
        Self { paths, installers }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Ensures the directory layout exists, then installs every tool.
    ///
    /// All installers run to completion even when some fail. The error
    /// returned is the first one to arrive; the rest are logged.
    pub async fn install(&self) -> Result<()> {
        self.paths.ensure_dirs_exist()?;

        info!("Setting up {} tools", self.installers.len());

        let mut tasks: FuturesUnordered<_> = self
            .installers
            .iter()
            .map(|installer| {
                let tool = installer.tool();
                let installer = installer.clone();
                let handle = tokio::spawn(async move { installer.setup().await });
                async move { (tool, handle.await) }
            })
            .collect();

        let mut first_error: Option<Error> = None;

        while let Some((tool, joined)) = tasks.next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(Error::TaskFailed {
                    task: tool.to_string(),
                    reason: e.to_string(),
                })
            });

            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!("{} setup also failed: {}", tool.title(), e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All tools are ready");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, AppEvent};
    use crate::resources::types::{InstallTarget, Platform, ToolLocation};
    use crate::test_support::{local_fetcher, Route, TestServer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FakeInstaller {
        tool: ToolId,
        delay: Duration,
        fail: bool,
        ran: AtomicUsize,
        finished: AtomicBool,
    }

    impl FakeInstaller {
        fn new(tool: ToolId, delay_ms: u64, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                tool,
                delay: Duration::from_millis(delay_ms),
                fail,
                ran: AtomicUsize::new(0),
                finished: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl ToolInstaller for FakeInstaller {
        fn tool(&self) -> ToolId {
            self.tool
        }

        async fn setup(&self) -> Result<()> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            if self.fail {
                Err(Error::InvalidSection(self.tool.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn paths(temp: &TempDir) -> AppPaths {
        AppPaths::at(temp.path().join(".ytdlp"), Platform::Windows)
    }

    #[tokio::test]
    async fn test_waits_for_every_installer() {
        let temp = TempDir::new().unwrap();
        let fast = FakeInstaller::new(ToolId::YtDlp, 0, false);
        let slow = FakeInstaller::new(ToolId::Ffmpeg, 50, false);

        let setup = Setup::with_installers(
            paths(&temp),
            vec![fast.clone() as Arc<dyn ToolInstaller>, slow.clone()],
        );
        setup.install().await.unwrap();

        assert!(fast.finished.load(Ordering::SeqCst));
        assert!(slow.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_installers() {
        let temp = TempDir::new().unwrap();
        let failing = FakeInstaller::new(ToolId::YtDlp, 0, true);
        let slow = FakeInstaller::new(ToolId::Ffmpeg, 50, false);

        let setup = Setup::with_installers(
            paths(&temp),
            vec![failing.clone() as Arc<dyn ToolInstaller>, slow.clone()],
        );
        let err = setup.install().await.unwrap_err();

        assert!(matches!(err, Error::InvalidSection(ref t) if t == "yt-dlp"));
        assert!(slow.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_both_failing_returns_first_to_finish() {
        let temp = TempDir::new().unwrap();
        let early = FakeInstaller::new(ToolId::Ffmpeg, 0, true);
        let late = FakeInstaller::new(ToolId::YtDlp, 50, true);

        let setup = Setup::with_installers(
            paths(&temp),
            vec![late.clone() as Arc<dyn ToolInstaller>, early.clone()],
        );
        let err = setup.install().await.unwrap_err();

        assert!(matches!(err, Error::InvalidSection(ref t) if t == "ffmpeg"));
        assert!(late.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_layout_failure_aborts_before_installers_run() {
        let temp = TempDir::new().unwrap();
        let blocked = temp.path().join(".ytdlp");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let installer = FakeInstaller::new(ToolId::YtDlp, 0, false);

        let setup = Setup::with_installers(
            AppPaths::at(&blocked, Platform::Windows),
            vec![installer.clone() as Arc<dyn ToolInstaller>],
        );
        let err = setup.install().await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }), "unexpected: {err:?}");
        assert_eq!(installer.ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_creates_layout() {
        let temp = TempDir::new().unwrap();
        let paths = paths(&temp);

        Setup::with_installers(paths.clone(), Vec::new())
            .install()
            .await
            .unwrap();

        assert!(paths.download_dir().is_dir());
        assert!(paths.resource_dir().is_dir());
        assert!(paths.temp_dir().is_dir());
    }

    #[tokio::test]
    async fn test_panicking_installer_becomes_task_failure() {
        struct Panics;

        #[async_trait]
        impl ToolInstaller for Panics {
            fn tool(&self) -> ToolId {
                ToolId::Ffmpeg
            }

            async fn setup(&self) -> Result<()> {
                panic!("installer blew up");
            }
        }

        let temp = TempDir::new().unwrap();
        let setup = Setup::with_installers(paths(&temp), vec![Arc::new(Panics) as Arc<dyn ToolInstaller>]);
        let err = setup.install().await.unwrap_err();

        assert!(
            matches!(err, Error::TaskFailed { ref task, .. } if task == "ffmpeg"),
            "unexpected: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_second_install_is_offline() {
        let server = TestServer::start([
            ("/yt-dlp.exe", Route::Body(b"yt".to_vec())),
            ("/ffmpeg.exe", Route::Body(b"ff".to_vec())),
        ])
        .await;
        let temp = TempDir::new().unwrap();
        let paths = paths(&temp);
        let fetcher = Arc::new(local_fetcher());
        let (tx, mut rx) = event_channel();
        let sink: Arc<dyn EventSink> = Arc::new(tx);

        let installers: Vec<Arc<dyn ToolInstaller>> = [
            (ToolId::YtDlp, "yt-dlp.exe"),
            (ToolId::Ffmpeg, "ffmpeg.exe"),
        ]
        .into_iter()
        .map(|(tool, file)| {
            let install_dir = paths.tool_dir(tool);
            let binary = install_dir.join(file);
            let target = InstallTarget {
                tool,
                url: server.url(&format!("/{file}")),
                location: ToolLocation::Managed(binary.clone()),
                install_dir,
                fetch_path: binary,
                archive: None,
            };
            Arc::new(TargetInstaller::new(
                target,
                fetcher.clone(),
                sink.clone(),
                Platform::Windows,
            )) as Arc<dyn ToolInstaller>
        })
        .collect();

        let setup = Setup::with_installers(paths.clone(), installers);
        setup.install().await.unwrap();

        let after_first = server.requests();
        assert_eq!(after_first, 4);
        let stops = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| matches!(e, AppEvent::ResourceStop(_)))
            .count();
        assert_eq!(stops, 2);

        setup.install().await.unwrap();
        assert_eq!(server.requests(), after_first);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_search_path_platform_installs_nothing() {
        let temp = TempDir::new().unwrap();
        let paths = AppPaths::at(temp.path().join(".ytdlp"), Platform::Linux);
        let (tx, mut rx) = event_channel();

        let setup = Setup::new(paths.clone(), &Settings::default(), Arc::new(tx));
        setup.install().await.unwrap();

        assert!(paths.resource_dir().is_dir());
        assert!(!paths.tool_dir(ToolId::Ffmpeg).exists());
        assert!(rx.try_recv().is_err());
    }
}
