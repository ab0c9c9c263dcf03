//! Snapshot archive download
//!
//! Streams an HTTP(S) response body straight into a local file, reporting
//! progress to a [`ProgressObserver`] after every received chunk. The body
//! is never buffered whole in memory.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::progress::{self, ProgressObserver};
use crate::types::DownloadJob;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;


/// Streams a remote archive to disk
pub struct Downloader {
    /// HTTP client; certificate verification is always on
    client: reqwest::Client,
    /// Download settings
    config: DownloadConfig,
    /// Progress sink
    observer: Arc<dyn ProgressObserver>,
}

impl Downloader {
    /// Build the HTTP transport from `config`
    ///
    /// Fails with [`DownloadError::TransportInit`] if the client (TLS
    /// backend, connector) cannot be constructed.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .https_only(config.require_https)
            .danger_accept_invalid_certs(false);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| DownloadError::TransportInit {
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            config,
            observer: progress::noop(),
        })
    }

    /// Replace the progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Download settings in use
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `url` into `destination`, truncating any existing file
    ///
    /// The parent directory of `destination` must already exist. On failure
    /// the partially written file is left on disk for the caller to keep or
    /// discard.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if `url` is malformed or its scheme is not allowed
    /// - [`DownloadError::FileOpen`] if `destination` cannot be opened for writing
    /// - [`DownloadError::Transport`] on non-success status, connection, TLS or body errors
    /// - [`DownloadError::FileWrite`] if a received chunk cannot be written
    pub async fn download(&self, url: &str, destination: &Path) -> Result<DownloadJob> {
        let url = self.parse_url(url)?;
        let mut job = DownloadJob::new(url.as_str(), destination);

        info!(url = %url, ?destination, "starting snapshot download");

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|source| DownloadError::FileOpen {
                path: destination.to_path_buf(),
                source,
            })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, %status, "snapshot server returned error status");
            return Err(DownloadError::Transport {
                url: url.to_string(),
                reason: format!("HTTP status {}", status),
            }
            .into());
        }

        job.total_bytes = response.content_length();
        debug!(url = %url, total_bytes = ?job.total_bytes, "receiving snapshot body");

        let label = self.config.progress_label.as_str();
        progress::report_progress(self.observer.as_ref(), label, 0.0);

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| transport_error(&url, &e))?;

            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::FileWrite {
                    path: destination.to_path_buf(),
                    source,
                })?;

            let percent = job.record_chunk(chunk.len());
            progress::report_progress(self.observer.as_ref(), label, percent);
        }

        file.flush()
            .await
            .map_err(|source| DownloadError::FileWrite {
                path: destination.to_path_buf(),
                source,
            })?;

        if let Some(total) = job.total_bytes.filter(|total| job.bytes_received < *total) {
            return Err(DownloadError::Transport {
                url: url.to_string(),
                reason: format!(
                    "connection closed after {} of {} bytes",
                    job.bytes_received, total
                ),
            }
            .into());
        }

        info!(
            url = %url,
            ?destination,
            bytes = job.bytes_received,
            "snapshot download complete"
        );

        Ok(job)
    }

    /// Parse and check the URL scheme before any file is touched
    fn parse_url(&self, url: &str) -> std::result::Result<Url, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "https" => Ok(parsed),
            "http" if !self.config.require_https => Ok(parsed),
            "http" => Err(DownloadError::InvalidUrl {
                url: url.to_string(),
                reason: "plain http is not allowed (download.require_https is set)".to_string(),
            }),
            other => Err(DownloadError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Turn a reqwest error into a transport error with its full cause chain
///
/// TLS and DNS failures are buried a few `source()` levels down, and the
/// top-level message alone ("error sending request") is useless to a user.
fn transport_error(url: &Url, e: &reqwest::Error) -> DownloadError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "body transfer failed"
    } else {
        "request failed"
    };

    let mut reason = format!("{}: {}", kind, e);
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }

    warn!(url = %url, error = %reason, "snapshot transfer failed");

    DownloadError::Transport {
        url: url.to_string(),
        reason,
    }
}
