use crate::error::ExtractError;
use crate::path_ops;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// An open ZIP archive
///
/// Owns the file handle and the decoder state. Dropping the handle closes
/// the archive, so it is released on every exit path of the extraction
/// loop, including early returns.
pub struct ArchiveHandle {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl ArchiveHandle {
    /// Open `path` and read its central directory
    ///
    /// A missing file or anything that is not a ZIP container fails with
    /// [`ExtractError::ArchiveOpen`]. A recognised container whose global
    /// metadata cannot be used (e.g. multi-disk archives) fails with
    /// [`ExtractError::ArchiveMetadata`].
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let file = File::open(path).map_err(|e| ExtractError::ArchiveOpen {
            archive: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let archive = ZipArchive::new(file).map_err(|e| match e {
            ZipError::UnsupportedArchive(reason) => ExtractError::ArchiveMetadata {
                archive: path.to_path_buf(),
                reason: reason.to_string(),
            },
            other => ExtractError::ArchiveOpen {
                archive: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        debug!(?path, entries = archive.len(), "opened archive");

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Path the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries recorded in the central directory
    pub fn entry_count(&self) -> usize {
        self.archive.len()
    }

    /// Read the name and metadata of entry `index` without decompressing it
    pub fn entry(&mut self, index: usize) -> Result<ArchiveEntry, ExtractError> {
        let raw = self
            .archive
            .by_index_raw(index)
            .map_err(|e| ExtractError::EntryMetadata {
                archive: self.path.clone(),
                index,
                reason: e.to_string(),
            })?;

        let name = raw.name().to_string();
        let relative_path = raw
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ExtractError::EntryMetadata {
                archive: self.path.clone(),
                index,
                reason: format!("entry name '{}' escapes the output directory", name),
            })?;

        Ok(ArchiveEntry {
            index,
            is_dir: path_ops::ends_with_separator(&name),
            size: raw.size(),
            compressed_size: raw.compressed_size(),
            name,
            relative_path,
        })
    }

    /// Open the decompressing data stream of `entry`
    ///
    /// The stream borrows the handle, so it is closed before the next entry
    /// can be opened.
    pub fn open_entry(&mut self, entry: &ArchiveEntry) -> Result<impl Read + '_, ExtractError> {
        let path = &self.path;
        self.archive
            .by_index(entry.index)
            .map_err(|e| ExtractError::EntryOpen {
                archive: path.clone(),
                name: entry.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Metadata of one archive entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the central directory
    pub index: usize,
    /// Name exactly as stored in the archive
    pub name: String,
    /// Stored name, checked not to escape the output root
    pub relative_path: PathBuf,
    /// Whether the stored name ends with a path separator
    pub is_dir: bool,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
}
