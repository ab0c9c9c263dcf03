//! Filesystem path operations used by the download and extraction stages
//!
//! These helpers never panic. Absence of a path is not an error for
//! [`exists`] or [`remove_directory_tree`].

use crate::error::PathError;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Check whether a file, directory or symlink is present at `path`
///
/// # Examples
///
/// ```
/// use snapshot_bootstrap::path_ops::exists;
///
/// assert!(!exists("/definitely/not/here"));
/// ```
#[must_use]
pub fn exists(path: impl AsRef<Path>) -> bool {
    fs::symlink_metadata(path.as_ref()).is_ok()
}

/// Make sure `path` is a directory, creating it and any missing ancestors
///
/// Succeeds without touching anything if the directory already exists, so
/// it is safe to call repeatedly. Fails with [`PathError::NotADirectory`]
/// if something other than a directory occupies `path`.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<(), PathError> {
    let path = path.as_ref();

    if !exists(path) {
        debug!(?path, "creating directory");
        return fs::create_dir_all(path).map_err(|source| PathError::Filesystem {
            path: path.to_path_buf(),
            source,
        });
    }

    if !path.is_dir() {
        warn!(?path, "path exists but is not a directory");
        return Err(PathError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Recursively delete `path` and everything below it
///
/// A missing path is a successful no-op. On failure the tree may be
/// partially deleted; re-running is safe because every existence check is
/// repeated.
pub fn remove_directory_tree(path: impl AsRef<Path>) -> Result<(), PathError> {
    let path = path.as_ref();

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(?path, "directory does not exist, nothing to remove");
            return Ok(());
        }
        Err(source) => {
            warn!(?path, error = %source, "failed to stat directory for removal");
            return Err(PathError::Filesystem {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            info!(?path, "directory removed");
            Ok(())
        }
        Err(source) => {
            warn!(?path, error = %source, "failed to remove directory");
            Err(PathError::Filesystem {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Whether an archive entry name denotes a directory
///
/// ZIP stores directories with a trailing `/`. A trailing `\` is an
/// ordinary file-name character, not a directory marker.
#[must_use]
pub fn ends_with_separator(name: &str) -> bool {
    name.ends_with('/')
}
