//! Error types for snapshot-bootstrap
//!
//! Each pipeline component has its own error enum:
//! - [`PathError`] for filesystem path operations
//! - [`DownloadError`] for fetching the snapshot archive
//! - [`ExtractError`] for unpacking the archive
//!
//! They all convert into the top-level [`Error`], which knows which pipeline
//! [`Stage`] it originated from.

use crate::types::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for snapshot-bootstrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snapshot-bootstrap
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "extraction.buffer_size")
        key: Option<String>,
    },

    /// Filesystem path operation failed
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Snapshot download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Archive extraction failed
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),
}

impl Error {
    /// The pipeline stage this error originated from, if any
    ///
    /// Configuration errors are raised before the pipeline starts and carry
    /// no stage. Path errors only reach the orchestrator through the
    /// pre-download cleanup, so they map to [`Stage::Prepare`].
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Config { .. } => None,
            Error::Path(_) => Some(Stage::Prepare),
            Error::Download(_) => Some(Stage::Download),
            Error::Extract(_) => Some(Stage::Extract),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Path(e) => match e {
                PathError::NotADirectory { .. } => "not_a_directory",
                PathError::Filesystem { .. } => "filesystem_error",
            },
            Error::Download(e) => match e {
                DownloadError::InvalidUrl { .. } => "invalid_url",
                DownloadError::TransportInit { .. } => "transport_init_error",
                DownloadError::FileOpen { .. } => "file_open_error",
                DownloadError::Transport { .. } => "transport_error",
                DownloadError::FileWrite { .. } => "file_write_error",
            },
            Error::Extract(e) => match e {
                ExtractError::ArchiveOpen { .. } => "archive_open_error",
                ExtractError::Destination { .. } => "destination_error",
                ExtractError::ArchiveMetadata { .. } => "archive_metadata_error",
                ExtractError::EntryMetadata { .. } => "entry_metadata_error",
                ExtractError::EntryOpen { .. } => "entry_open_error",
                ExtractError::EntryRead { .. } => "entry_read_error",
                ExtractError::EntryWrite { .. } => "entry_write_error",
                ExtractError::TaskFailed { .. } => "extraction_task_failed",
            },
        }
    }
}

/// Filesystem path errors
#[derive(Debug, Error)]
pub enum PathError {
    /// Path exists but is not a directory
    #[error("{path} exists but is not a directory")]
    NotADirectory {
        /// The offending path
        path: PathBuf,
    },

    /// Creating or removing a path failed
    #[error("filesystem operation on {path} failed: {source}")]
    Filesystem {
        /// The path being created or removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL is malformed or uses a disallowed scheme
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why the URL was rejected
        reason: String,
    },

    /// The HTTP transport could not be constructed
    #[error("failed to initialize HTTP client: {reason}")]
    TransportInit {
        /// Diagnostic from the HTTP client builder
        reason: String,
    },

    /// The destination file could not be opened for writing
    #[error("failed to open {path} for writing: {source}")]
    FileOpen {
        /// Destination file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The transfer did not complete cleanly
    #[error("transfer of '{url}' failed: {reason}")]
    Transport {
        /// The URL being fetched
        url: String,
        /// Diagnostic from the transport (status code, connect, TLS, timeout)
        reason: String,
    },

    /// Writing a received chunk to the destination file failed
    #[error("failed to write to {path}: {source}")]
    FileWrite {
        /// Destination file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Archive is missing, corrupt or not a ZIP container
    #[error("failed to open archive {archive}: {reason}")]
    ArchiveOpen {
        /// The archive file
        archive: PathBuf,
        /// Why it could not be opened
        reason: String,
    },

    /// Output root could not be prepared
    #[error("failed to prepare destination {path}: {reason}")]
    Destination {
        /// The output root
        path: PathBuf,
        /// Why it could not be prepared
        reason: String,
    },

    /// Archive-level metadata (entry count, central directory) is unusable
    #[error("failed to read metadata of archive {archive}: {reason}")]
    ArchiveMetadata {
        /// The archive file
        archive: PathBuf,
        /// Diagnostic from the archive reader
        reason: String,
    },

    /// An entry's name or metadata could not be read
    #[error("failed to read metadata of entry {index} in {archive}: {reason}")]
    EntryMetadata {
        /// The archive file
        archive: PathBuf,
        /// Zero-based entry index
        index: usize,
        /// Diagnostic from the archive reader
        reason: String,
    },

    /// An entry's data stream could not be opened
    #[error("failed to open entry '{name}' in {archive}: {reason}")]
    EntryOpen {
        /// The archive file
        archive: PathBuf,
        /// Stored entry name
        name: String,
        /// Diagnostic from the archive reader
        reason: String,
    },

    /// Decompressing an entry's payload failed (corrupt data, CRC mismatch)
    #[error("failed to decompress entry '{name}' in {archive}: {reason}")]
    EntryRead {
        /// The archive file
        archive: PathBuf,
        /// Stored entry name
        name: String,
        /// Diagnostic from the decoder
        reason: String,
    },

    /// The entry's destination could not be created or written
    #[error("failed to write {path}: {reason}")]
    EntryWrite {
        /// Destination path of the entry
        path: PathBuf,
        /// Underlying I/O diagnostic
        reason: String,
    },

    /// The blocking extraction task did not complete
    #[error("extraction of {archive} did not complete: {reason}")]
    TaskFailed {
        /// The archive file
        archive: PathBuf,
        /// Join error from the blocking pool
        reason: String,
    },
}
