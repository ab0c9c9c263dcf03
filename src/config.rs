//! Configuration types for snapshot-bootstrap

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Snapshot download settings
///
/// Used as a nested sub-config within [`BootstrapConfig`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Snapshot archive URL (only needed for [`Bootstrapper::run_configured`](crate::Bootstrapper::run_configured))
    #[serde(default)]
    pub url: Option<String>,

    /// Where the archive is written while the pipeline runs (default: "bootstrap.zip")
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Reject plain `http://` URLs (default: true)
    #[serde(default = "default_true")]
    pub require_https: bool,

    /// TCP/TLS connect timeout (default: 30s)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Overall transfer timeout (None = no limit, the default)
    ///
    /// Snapshots can be many gigabytes, so the whole-request timeout is off
    /// unless a host explicitly wants one.
    #[serde(default)]
    pub timeout: Option<Duration>,

    /// User-Agent header sent with the request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Label passed to the progress observer during the transfer
    #[serde(default = "default_download_label")]
    pub progress_label: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url: None,
            archive_path: default_archive_path(),
            require_https: true,
            connect_timeout: default_connect_timeout(),
            timeout: None,
            user_agent: default_user_agent(),
            progress_label: default_download_label(),
        }
    }
}

/// Archive extraction settings
///
/// Used as a nested sub-config within [`BootstrapConfig`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Directory the snapshot is unpacked into (default: "data")
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Size of the copy buffer used per entry in bytes (default: 64 KiB)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Remove the destination tree before unpacking (default: false)
    #[serde(default)]
    pub clear_destination: bool,

    /// Label passed to the progress observer while unpacking
    #[serde(default = "default_extract_label")]
    pub progress_label: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            buffer_size: default_buffer_size(),
            clear_destination: false,
            progress_label: default_extract_label(),
        }
    }
}

/// Main configuration for [`Bootstrapper`](crate::Bootstrapper)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Download stage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extraction stage settings
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl BootstrapConfig {
    /// Check settings that would otherwise fail deep inside the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.extraction.buffer_size == 0 {
            return Err(config_error(
                "buffer size must be greater than zero",
                "extraction.buffer_size",
            ));
        }

        if self.download.progress_label.trim().is_empty() {
            return Err(config_error(
                "progress label must not be empty",
                "download.progress_label",
            ));
        }

        if self.extraction.progress_label.trim().is_empty() {
            return Err(config_error(
                "progress label must not be empty",
                "extraction.progress_label",
            ));
        }

        if self.download.archive_path.as_os_str().is_empty() {
            return Err(config_error(
                "archive path must not be empty",
                "download.archive_path",
            ));
        }

        if self.extraction.destination.as_os_str().is_empty() {
            return Err(config_error(
                "destination must not be empty",
                "extraction.destination",
            ));
        }

        if self.download.connect_timeout.is_zero() {
            return Err(config_error(
                "connect timeout must be greater than zero",
                "download.connect_timeout",
            ));
        }

        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("bootstrap.zip")
}

fn default_destination() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("snapshot-bootstrap/{}", env!("CARGO_PKG_VERSION"))
}

fn default_download_label() -> String {
    "Downloading bootstrap".to_string()
}

fn default_extract_label() -> String {
    "Extracting bootstrap".to_string()
}

fn default_buffer_size() -> usize {
    64 * 1024
}
