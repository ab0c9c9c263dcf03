//! Core types for snapshot-bootstrap

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Clearing stale state before extraction
    Prepare,
    /// Fetching the snapshot archive
    Download,
    /// Unpacking the snapshot archive
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Download => "download",
            Stage::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Event forwarded by [`ChannelObserver`](crate::progress::ChannelObserver)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Progress update
    Progress {
        /// What is progressing (e.g. "Downloading bootstrap")
        label: String,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
    },

    /// Free-form status message
    Message {
        /// Message text
        message: String,
    },
}

/// State of a single archive download
///
/// Created when the transfer starts and updated on every received chunk.
/// Returned to the caller once the transfer completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Source URL
    pub url: String,
    /// Local file the body is written to
    pub destination: PathBuf,
    /// Bytes received so far
    pub bytes_received: u64,
    /// Total size announced by the server, if any
    pub total_bytes: Option<u64>,
    /// Last computed progress percentage
    pub percent: f32,
}

impl DownloadJob {
    /// Create a job with nothing transferred yet
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            bytes_received: 0,
            total_bytes: None,
            percent: 0.0,
        }
    }

    /// Record a received chunk and return the updated percentage
    ///
    /// The percentage is `received / total * 100` when the total is known and
    /// positive, clamped to 100 in case the server under-reports its size.
    /// Without a usable total it stays at 0.
    pub fn record_chunk(&mut self, len: usize) -> f32 {
        self.bytes_received = self.bytes_received.saturating_add(len as u64);
        self.percent = match self.total_bytes {
            Some(total) if total > 0 => {
                ((self.bytes_received as f64 / total as f64) * 100.0).min(100.0) as f32
            }
            _ => 0.0,
        };
        self.percent
    }

    /// Whether the announced size has been fully received
    pub fn is_complete(&self) -> bool {
        matches!(self.total_bytes, Some(total) if total > 0 && self.bytes_received >= total)
    }
}

/// Outcome of a successful extraction pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Number of entries processed
    pub entries: usize,
    /// Files written under the output root
    pub files: Vec<PathBuf>,
    /// Directories created for directory entries
    pub directories: Vec<PathBuf>,
    /// Total decompressed bytes written
    pub bytes_written: u64,
    /// Whether the source archive was deleted afterwards
    pub archive_removed: bool,
}

/// Outcome of a full bootstrap run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Download stage result
    pub download: DownloadJob,
    /// Extraction stage result
    pub extraction: ExtractionSummary,
    /// Wall-clock time spent in the pipeline
    pub elapsed: Duration,
}
