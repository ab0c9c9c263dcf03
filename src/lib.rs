//! # snapshot-bootstrap
//!
//! Seed a local data directory from a pre-built snapshot instead of building
//! it up incrementally.
//!
//! The pipeline is linear and fail-fast:
//! URL -> local archive file -> extracted directory tree -> archive deleted.
//!
//! - **Library-first** - the host decides whether and when to bootstrap
//! - **Observer-driven** - progress is pushed to a [`ProgressObserver`], no polling
//! - **Stage-tagged errors** - every failure says whether it happened while
//!   downloading or extracting
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapshot_bootstrap::{BootstrapConfig, Bootstrapper, ChannelObserver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = BootstrapConfig::default();
//!     config.download.url = Some("https://snapshots.example.com/latest.zip".to_string());
//!     config.download.archive_path = "/var/lib/node/bootstrap.zip".into();
//!     config.extraction.destination = "/var/lib/node".into();
//!
//!     let observer = Arc::new(ChannelObserver::new(256));
//!     let mut events = observer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = Bootstrapper::new(config)?
//!         .with_observer(observer)
//!         .run_configured()
//!         .await?;
//!
//!     println!("{} files extracted", report.extraction.files.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Download -> extract pipeline
pub mod bootstrap;
/// Configuration types
pub mod config;
/// Snapshot archive download
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Filesystem path operations
pub mod path_ops;
/// Progress observers
pub mod progress;
/// Core types and events
pub mod types;


// Re-export commonly used types
pub use bootstrap::Bootstrapper;
pub use config::{BootstrapConfig, DownloadConfig, ExtractionConfig};
pub use downloader::Downloader;
pub use error::{DownloadError, Error, ExtractError, PathError, Result};
pub use extraction::{ArchiveEntry, ArchiveExtractor, ArchiveHandle};
pub use progress::{ChannelObserver, NoOpObserver, ProgressObserver, TracingObserver};
pub use types::{BootstrapReport, DownloadJob, Event, ExtractionSummary, Stage};
