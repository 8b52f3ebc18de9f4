//! Parallel hashing of an existing output tree.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::HashIndex;
use crate::hash::ContentHash;

/// Number of files hashed concurrently unless configured otherwise.
///
/// Fixed rather than CPU-derived: the work is disk-bound.
pub const DEFAULT_SCAN_WORKERS: usize = 15;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root could not be read.
    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The scan root exists but is not a directory.
    #[error("scan root {path} is not a directory")]
    NotADirectory { path: PathBuf },

    /// The worker pool was closed before all files were submitted.
    #[error("scan worker pool closed unexpectedly")]
    PoolClosed,

    /// The file enumeration task failed.
    #[error("file enumeration task failed: {source}")]
    Enumeration {
        #[source]
        source: JoinError,
    },
}

impl ScanError {
    fn root_unreadable(path: &Path, source: io::Error) -> Self {
        Self::RootUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Hashes every regular file under `root` and returns the resulting index.
///
/// At most `workers` files are hashed at once (minimum one). All hashing
/// completes before the index is built; when several files share a hash,
/// the one enumerated last is kept. Files that cannot be read are logged and
/// skipped. A root that does not exist yet holds no files and yields an
/// empty index.
///
/// # Errors
///
/// Returns [`ScanError::RootUnreadable`] or [`ScanError::NotADirectory`] if
/// `root` exists but cannot be scanned.
#[instrument(skip(root), fields(root = %root.display()))]
pub async fn scan_existing_files(root: &Path, workers: usize) -> Result<HashIndex, ScanError> {
    let metadata = match tokio::fs::metadata(root).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("scan root does not exist yet, nothing to index");
            return Ok(HashIndex::new());
        }
        Err(e) => return Err(ScanError::root_unreadable(root, e)),
    };
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let walk_root = root.to_path_buf();
    let files = tokio::task::spawn_blocking(move || list_files(&walk_root))
        .await
        .map_err(|source| ScanError::Enumeration { source })?;
    debug!(file_count = files.len(), "enumerated existing files");

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::PoolClosed)?;
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let hash = ContentHash::of_file(&path);
            (path, hash)
        }));
    }

    // Join barrier: nothing is visible until every file has been hashed.
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "hash task panicked"),
        }
    }

    let mut index = HashIndex::new();
    for (path, hash) in results {
        match hash {
            Ok(hash) => {
                index.insert(hash, path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    info!(unique_files = index.len(), "existing file scan complete");
    Ok(index)
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "skipping unreadable directory entry"),
        }
    }
    files
}
