//! HTTP file fetcher with polled progress reporting.
//!
//! The total size comes from a HEAD request. While the GET body streams into
//! the destination file, a poller samples the file size on disk once per
//! interval and reports it as a percentage of that total.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Settings, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{Error, Result};

// ============================================================================
// URL Policy
// ============================================================================

/// Which URLs tool downloads may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Reject anything that isn't `https`.
    pub require_https: bool,
    /// Allowed hosts; subdomains match too. Empty means any host.
    pub allowed_domains: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            require_https: true,
            allowed_domains: vec!["github.com".to_string()],
        }
    }
}

impl UrlPolicy {
    /// Any http(s) URL on any host.
    pub fn allow_any() -> Self {
        Self {
            require_https: false,
            allowed_domains: Vec::new(),
        }
    }

    /// Validates that a URL is acceptable for downloading.
    pub fn validate(&self, url_str: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidUrl {
            url: url_str.to_string(),
            reason,
        };

        let url = Url::parse(url_str).map_err(|e| invalid(e.to_string()))?;

        match url.scheme() {
            "https" => {}
            "http" if !self.require_https => {}
            scheme => return Err(invalid(format!("scheme {scheme} is not allowed"))),
        }

        let host = url
            .host_str()
            .ok_or_else(|| invalid("URL must have a host".to_string()))?;

        if self.allowed_domains.is_empty() {
            return Ok(());
        }

        let is_allowed = self
            .allowed_domains
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{}", domain)));

        if !is_allowed {
            return Err(invalid(format!(
                "host {} is not in {:?}",
                host, self.allowed_domains
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Fetch Progress
// ============================================================================

/// Progress information during a fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchProgress {
    /// Bytes on disk when sampled.
    pub bytes_written: u64,
    /// Total bytes announced by the server.
    pub total_bytes: u64,
    /// `bytes_written / total_bytes * 100`; not clamped.
    pub percent: f64,
}

impl FetchProgress {
    pub fn new(bytes_written: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes > 0 {
            bytes_written as f64 / total_bytes as f64 * 100.0
        } else {
            100.0
        };

        Self {
            bytes_written,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Downloads remote files to disk.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    poll_interval: Duration,
    policy: UrlPolicy,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            policy: UrlPolicy::default(),
        }
    }
}

impl Fetcher {
    /// Creates a fetcher configured from settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            poll_interval: settings.poll_interval(),
            policy: settings.url_policy(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_policy(mut self, policy: UrlPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Downloads `url` to `dest`, reporting progress through `on_progress`.
    ///
    /// The size request happens before `dest` is created, so a failed HEAD
    /// leaves nothing behind. A failed transfer leaves the partial file.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is rejected by the policy.
    /// - Either request fails or returns a non-success status.
    /// - The server does not announce a usable Content-Length.
    /// - The file cannot be created or written.
    pub async fn fetch<F>(&self, url: &str, dest: &Path, on_progress: F) -> Result<u64>
    where
        F: Fn(FetchProgress) + Sync,
    {
        info!("Fetching {} to {}", url, dest.display());

        self.policy.validate(url)?;

        let total = self.content_length(url).await?;
        debug!("Content-Length: {}", total);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::io("create directory", parent))?;
        }

        let file = File::create(dest).await.map_err(Error::io("create", dest))?;

        let (done_tx, done_rx) = oneshot::channel();
        let transfer = self.transfer(url, dest, file, done_tx);
        let poller = poll_progress(dest, total, self.poll_interval, done_rx, &on_progress);

        let (result, ()) = tokio::join!(transfer, poller);
        let bytes_written = result?;

        info!(
            "Fetch complete: {} bytes written to {}",
            bytes_written,
            dest.display()
        );

        Ok(bytes_written)
    }

    async fn content_length(&self, url: &str) -> Result<u64> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;

        check_status(url, &response)?;

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| Error::MissingContentLength {
                url: url.to_string(),
            })
    }

    /// Streams the GET body into `file`.
    ///
    /// On success the final byte count goes through `done`; on failure
    /// `done` is dropped. Either way the poller stops.
    async fn transfer(
        &self,
        url: &str,
        dest: &Path,
        mut file: File,
        done: oneshot::Sender<u64>,
    ) -> Result<u64> {
        let http_error = |source| Error::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;
        check_status(url, &response)?;

        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(http_error)?;
            file.write_all(&chunk)
                .await
                .map_err(Error::io("write", dest))?;
            bytes_written += chunk.len() as u64;
        }

        file.flush().await.map_err(Error::io("flush", dest))?;

        let _ = done.send(bytes_written);
        Ok(bytes_written)
    }
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Samples the size of `path` every `interval` until `done` resolves.
///
/// A final sample built from the byte count in `done` is reported before
/// returning. A failed stat ends polling early.
async fn poll_progress<F>(
    path: &Path,
    total: u64,
    interval: Duration,
    mut done: oneshot::Receiver<u64>,
    on_progress: &F,
) where
    F: Fn(FetchProgress),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            finished = &mut done => {
                if let Ok(bytes_written) = finished {
                    on_progress(FetchProgress::new(bytes_written, total));
                }
                return;
            }
            _ = ticker.tick() => {
                match tokio::fs::metadata(path).await {
                    Ok(metadata) => on_progress(FetchProgress::new(metadata.len(), total)),
                    Err(e) => {
                        warn!("Stopping progress polling for {}: {}", path.display(), e);
                        return;
                    }
                }
            }
        }
    }
}
