//! Bootstrap pipeline: download, extract, clean up
//!
//! Stages run strictly one after another:
//! 1. Prepare - optionally wipe the extraction root
//! 2. Download - stream the snapshot archive to disk
//! 3. Extract - unpack the archive and delete it
//!
//! The first failing stage stops the pipeline. Its error is returned
//! unchanged; [`Error::stage`] tells the caller where it came from so it can
//! decide whether to discard a partial archive. Nothing is retried.

use crate::config::BootstrapConfig;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::extraction::ArchiveExtractor;
use crate::path_ops;
use crate::progress::{self, ProgressObserver};
use crate::types::{BootstrapReport, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the download and extraction stages in sequence
pub struct Bootstrapper {
    config: BootstrapConfig,
    downloader: Downloader,
    extractor: ArchiveExtractor,
    observer: Arc<dyn ProgressObserver>,
}

impl Bootstrapper {
    /// Validate `config` and build both stages
    pub fn new(config: BootstrapConfig) -> Result<Self> {
        config.validate()?;

        let downloader = Downloader::new(config.download.clone())?;
        let extractor = ArchiveExtractor::new(config.extraction.clone())?;

        Ok(Self {
            config,
            downloader,
            extractor,
            observer: progress::noop(),
        })
    }

    /// Install an observer shared by every stage
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.downloader = self.downloader.with_observer(observer.clone());
        self.extractor = self.extractor.with_observer(observer.clone());
        self.observer = observer;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Run the pipeline with the URL and paths from the configuration
    ///
    /// Fails with [`Error::Config`] if `download.url` is not set.
    pub async fn run_configured(&self) -> Result<BootstrapReport> {
        let url = self.config.download.url.as_deref().ok_or_else(|| Error::Config {
            message: "no bootstrap URL configured".to_string(),
            key: Some("download.url".to_string()),
        })?;

        self.run(
            url,
            &self.config.download.archive_path,
            &self.config.extraction.destination,
        )
        .await
    }

    /// Download `url` to `archive_destination`, then unpack it into `extraction_root`
    ///
    /// Extraction only starts once the download succeeded. On success the
    /// archive has been deleted. On failure the archive (complete or partial)
    /// is left where it is.
    ///
    /// With `extraction.clear_destination` set, the extraction root is wiped
    /// before the download starts, so an archive stored inside the root is
    /// never removed by the cleanup.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use snapshot_bootstrap::{BootstrapConfig, Bootstrapper, Stage, TracingObserver};
    /// use std::path::Path;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> snapshot_bootstrap::Result<()> {
    /// let bootstrapper = Bootstrapper::new(BootstrapConfig::default())?
    ///     .with_observer(Arc::new(TracingObserver::new()));
    ///
    /// match bootstrapper
    ///     .run(
    ///         "https://snapshots.example.com/latest.zip",
    ///         Path::new("/var/lib/node/bootstrap.zip"),
    ///         Path::new("/var/lib/node"),
    ///     )
    ///     .await
    /// {
    ///     Ok(report) => println!("extracted {} files", report.extraction.files.len()),
    ///     Err(e) if e.stage() == Some(Stage::Download) => {
    ///         let _ = std::fs::remove_file("/var/lib/node/bootstrap.zip");
    ///     }
    ///     Err(e) => return Err(e),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(
        &self,
        url: &str,
        archive_destination: &Path,
        extraction_root: &Path,
    ) -> Result<BootstrapReport> {
        let started = Instant::now();

        info!(
            url,
            ?archive_destination,
            ?extraction_root,
            "starting bootstrap"
        );

        if self.config.extraction.clear_destination {
            self.report("Removing stale data");
            clear_extraction_root(archive_destination, extraction_root)
                .inspect_err(|e| log_failure(Stage::Prepare, e))?;
        }

        self.report("Downloading bootstrap archive");
        let download = self
            .downloader
            .download(url, archive_destination)
            .await
            .inspect_err(|e| log_failure(Stage::Download, e))?;

        self.report("Extracting bootstrap archive");
        let extraction = self
            .extractor
            .extract(archive_destination, extraction_root)
            .await
            .inspect_err(|e| log_failure(Stage::Extract, e))?;

        let elapsed = started.elapsed();
        info!(
            url,
            bytes = download.bytes_received,
            files = extraction.files.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "bootstrap complete"
        );
        self.report("Bootstrap complete");

        Ok(BootstrapReport {
            download,
            extraction,
            elapsed,
        })
    }

    fn report(&self, message: &str) {
        progress::report_message(self.observer.as_ref(), message);
    }
}

/// Wipe `extraction_root`, recreating the archive's parent if it lived inside
fn clear_extraction_root(archive_destination: &Path, extraction_root: &Path) -> Result<()> {
    path_ops::remove_directory_tree(extraction_root)?;

    if let Some(parent) = archive_destination
        .parent()
        .filter(|parent| parent.starts_with(extraction_root))
    {
        path_ops::ensure_directory(parent)?;
    }

    Ok(())
}

fn log_failure(stage: Stage, error: &Error) {
    warn!(%stage, code = error.code(), error = %error, "bootstrap stage failed");
}
