//! Snapshot archive extraction
//!
//! Unpacks a ZIP archive into an output root, entry by entry in the order
//! the archive stores them. The first bad entry aborts the whole pass; a
//! file that failed half-way is removed so it is never mistaken for a
//! complete one. After a successful pass the source archive is deleted.

mod archive;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use archive::{ArchiveEntry, ArchiveHandle};

use crate::config::ExtractionConfig;
use crate::error::{Error, ExtractError, Result};
use crate::path_ops;
use crate::progress::{self, ProgressObserver};
use crate::types::ExtractionSummary;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Unpacks ZIP archives into a directory tree
#[derive(Clone)]
pub struct ArchiveExtractor {
    config: ExtractionConfig,
    observer: Arc<dyn ProgressObserver>,
}

impl ArchiveExtractor {
    /// Create an extractor
    ///
    /// Fails with [`Error::Config`] if the copy buffer size is zero.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(Error::Config {
                message: "buffer size must be greater than zero".to_string(),
                key: Some("extraction.buffer_size".to_string()),
            });
        }

        Ok(Self {
            config,
            observer: progress::noop(),
        })
    }

    /// Replace the progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Extract `archive_path` into `output_root` on the blocking thread pool
    ///
    /// See [`extract_blocking`](Self::extract_blocking) for the semantics.
    pub async fn extract(
        &self,
        archive_path: &Path,
        output_root: &Path,
    ) -> Result<ExtractionSummary> {
        let extractor = self.clone();
        let archive_owned = archive_path.to_path_buf();
        let root_owned = output_root.to_path_buf();

        spawn_blocking(move || extractor.extract_blocking(&archive_owned, &root_owned))
            .await
            .map_err(|e| {
                Error::Extract(ExtractError::TaskFailed {
                    archive: archive_path.to_path_buf(),
                    reason: format!("extraction task panicked: {}", e),
                })
            })?
    }

    /// Extract `archive_path` into `output_root`, blocking the current thread
    ///
    /// `output_root` is created if missing. Directory entries become
    /// directories; file entries are streamed to `output_root/<name>` through
    /// a fixed-size buffer. On success the archive file is deleted; a failed
    /// deletion is logged and reported through
    /// [`ExtractionSummary::archive_removed`] but does not fail the call.
    ///
    /// # Errors
    ///
    /// Every [`ExtractError`] is fatal for the whole pass. The archive is
    /// left on disk so the caller can retry or inspect it.
    pub fn extract_blocking(
        &self,
        archive_path: &Path,
        output_root: &Path,
    ) -> Result<ExtractionSummary> {
        info!(?archive_path, ?output_root, "extracting snapshot archive");

        let mut handle = ArchiveHandle::open(archive_path)?;

        path_ops::ensure_directory(output_root).map_err(|e| ExtractError::Destination {
            path: output_root.to_path_buf(),
            reason: e.to_string(),
        })?;

        let count = handle.entry_count();
        debug!(?archive_path, entries = count, "archive opened");

        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut summary = (0..count).try_fold(ExtractionSummary::default(), |summary, index| {
            self.extract_entry(&mut handle, index, count, output_root, &mut buffer, summary)
        })?;

        // Release the archive before deleting it
        drop(handle);

        info!(
            ?archive_path,
            entries = summary.entries,
            files = summary.files.len(),
            directories = summary.directories.len(),
            bytes = summary.bytes_written,
            "snapshot extraction successful"
        );

        summary.archive_removed = match std::fs::remove_file(archive_path) {
            Ok(()) => {
                debug!(?archive_path, "removed source archive");
                true
            }
            Err(e) => {
                warn!(?archive_path, error = %e, "failed to remove source archive");
                false
            }
        };

        Ok(summary)
    }

    /// Extract a single entry and fold it into `summary`
    fn extract_entry(
        &self,
        handle: &mut ArchiveHandle,
        index: usize,
        count: usize,
        output_root: &Path,
        buffer: &mut [u8],
        mut summary: ExtractionSummary,
    ) -> std::result::Result<ExtractionSummary, ExtractError> {
        let entry = handle.entry(index)?;
        let archive_path = handle.path().to_path_buf();
        let target = output_root.join(&entry.relative_path);

        debug!(
            index,
            name = %entry.name,
            size = entry.size,
            is_dir = entry.is_dir,
            "extracting entry"
        );

        {
            let mut stream = handle.open_entry(&entry)?;

            if entry.is_dir {
                path_ops::ensure_directory(&target).map_err(|e| ExtractError::EntryWrite {
                    path: target.clone(),
                    reason: e.to_string(),
                })?;
                summary.directories.push(target);
            } else {
                let written =
                    write_file_entry(&mut stream, &entry, &archive_path, &target, buffer)?;
                summary.bytes_written += written;
                summary.files.push(target);
            }
        }

        summary.entries += 1;

        progress::report_message(
            self.observer.as_ref(),
            &format!("File extracted: {}", entry.name),
        );
        progress::report_progress(
            self.observer.as_ref(),
            &self.config.progress_label,
            (summary.entries as f64 / count as f64 * 100.0) as f32,
        );

        Ok(summary)
    }
}

/// Stream one file entry to `target`, removing the file again on failure
fn write_file_entry(
    stream: &mut impl Read,
    entry: &ArchiveEntry,
    archive_path: &Path,
    target: &Path,
    buffer: &mut [u8],
) -> std::result::Result<u64, ExtractError> {
    if let Some(parent) = target.parent() {
        path_ops::ensure_directory(parent).map_err(|e| ExtractError::EntryWrite {
            path: target.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    let mut file = File::create(target).map_err(|e| ExtractError::EntryWrite {
        path: target.to_path_buf(),
        reason: e.to_string(),
    })?;

    let result = copy_chunks(stream, &mut file, entry, archive_path, target, buffer);

    if result.is_err() {
        drop(file);
        if let Err(e) = std::fs::remove_file(target) {
            warn!(?target, error = %e, "failed to remove partially extracted file");
        }
    }

    result
}

/// Copy the decompressed payload through `buffer` until the entry is exhausted
fn copy_chunks(
    stream: &mut impl Read,
    file: &mut File,
    entry: &ArchiveEntry,
    archive_path: &Path,
    target: &Path,
    buffer: &mut [u8],
) -> std::result::Result<u64, ExtractError> {
    let mut written = 0u64;

    loop {
        let n = match stream.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ExtractError::EntryRead {
                    archive: archive_path.to_path_buf(),
                    name: entry.name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        file.write_all(&buffer[..n])
            .map_err(|e| ExtractError::EntryWrite {
                path: target.to_path_buf(),
                reason: e.to_string(),
            })?;
        written += n as u64;
    }

    file.flush().map_err(|e| ExtractError::EntryWrite {
        path: target.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(written)
}
