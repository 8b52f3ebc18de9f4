//! Per-resource commit: fetch, deduplicate, and place one resource on disk.
//!
//! [`ResourceCommitter::commit`] runs a fixed sequence of guarded steps and
//! reports the result as a [`CommitOutcome`]. It never returns an error; every
//! failure is folded into [`CommitOutcome::Failed`] so the caller can decide
//! whether the rest of the submission is still worth processing.

use std::fs::{FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::download::{DEFAULT_MAX_WAIT, FetchError};
use crate::filter::DownloadFilter;
use crate::index::HashIndex;
use crate::site::Resource;
use crate::submission::Submission;

/// Duplicate handling and fetch limits for a [`ResourceCommitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSettings {
    /// Skip content already in the index and stop the submission.
    pub no_dupes: bool,
    /// Hard-link content already in the index and stop the submission.
    pub make_hard_links: bool,
    /// Upper bound on a single fetch.
    pub max_wait: Duration,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            no_dupes: false,
            make_hard_links: false,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Why a resource could not be committed.
#[derive(Debug, Error)]
pub enum CommitFailure {
    /// The bytes could not be fetched in time.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A filesystem operation on the destination failed.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CommitFailure {
    fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of committing one resource.
#[derive(Debug)]
pub enum CommitOutcome {
    /// New content was written to the destination.
    Written,
    /// The destination already existed; nothing was fetched.
    SkippedExists,
    /// The download filter rejected the resource.
    SkippedFiltered,
    /// The content is already on disk at `existing`.
    SkippedDuplicate { existing: PathBuf },
    /// The destination was hard-linked to `existing`.
    Linked { existing: PathBuf },
    /// The resource could not be committed.
    Failed(CommitFailure),
}

impl CommitOutcome {
    /// Whether the submission's remaining resources should be abandoned.
    ///
    /// Duplicates, links, and fetch failures stop the submission; a failed
    /// filesystem operation only affects its own resource.
    #[must_use]
    pub fn aborts_submission(&self) -> bool {
        matches!(
            self,
            Self::SkippedDuplicate { .. }
                | Self::Linked { .. }
                | Self::Failed(CommitFailure::Fetch(_))
        )
    }
}

/// Commits resources to disk against a shared [`HashIndex`].
#[derive(Debug, Clone)]
pub struct ResourceCommitter {
    settings: CommitSettings,
    download_filter: Arc<dyn DownloadFilter>,
}

impl ResourceCommitter {
    #[must_use]
    pub fn new(settings: CommitSettings, download_filter: Arc<dyn DownloadFilter>) -> Self {
        Self {
            settings,
            download_filter,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CommitSettings {
        &self.settings
    }

    /// Commits `resource` to `destination`.
    ///
    /// On [`CommitOutcome::Written`] the file exists with the submission's
    /// creation time stamped on it (best effort). `index` maps its hash to
    /// `destination` unless an earlier path already holds the content.
    #[instrument(
        skip_all,
        fields(submission_id = %submission.id, path = %destination.display())
    )]
    pub async fn commit(
        &self,
        submission: &Submission,
        resource: Resource,
        destination: &Path,
        index: &mut HashIndex,
    ) -> CommitOutcome {
        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            debug!("File already exists, skipping");
            return CommitOutcome::SkippedExists;
        }

        if !self.download_filter.check_resource(&resource) {
            debug!(url = resource.url(), "Download filter removed resource");
            return CommitOutcome::SkippedFiltered;
        }

        let max_wait = self.settings.max_wait;
        let content = match tokio::time::timeout(max_wait, resource.fetch()).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                error!(url = resource.url(), error = %e, "Failed to download resource");
                return CommitOutcome::Failed(e.into());
            }
            Err(_) => {
                let e = FetchError::timeout(resource.url(), max_wait);
                error!(url = resource.url(), error = %e, "Failed to download resource");
                return CommitOutcome::Failed(e.into());
            }
        };

        if let Some(parent) = destination.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            let failure = CommitFailure::io("create directory", parent, e);
            error!(error = %failure, "Failed to prepare destination");
            return CommitOutcome::Failed(failure);
        }

        if let Some(existing) = index.get(&content.hash).map(Path::to_path_buf) {
            if self.settings.no_dupes {
                info!(
                    hash = %content.hash,
                    existing = %existing.display(),
                    "Resource already downloaded elsewhere, skipping"
                );
                return CommitOutcome::SkippedDuplicate { existing };
            }
            if self.settings.make_hard_links {
                if let Err(e) = tokio::fs::hard_link(&existing, destination).await {
                    let failure = CommitFailure::io("hard link", destination, e);
                    error!(error = %failure, "Failed to link duplicate resource");
                    return CommitOutcome::Failed(failure);
                }
                info!(existing = %existing.display(), "Hard link created");
                return CommitOutcome::Linked { existing };
            }
        }

        if let Err(failure) = write_atomically(destination, &content.bytes).await {
            error!(error = %failure, "Failed to write file");
            return CommitOutcome::Failed(failure);
        }

        stamp_creation_time(submission, destination).await;
        index.insert_if_absent(content.hash, destination.to_path_buf());
        info!(bytes = content.bytes.len(), "Downloaded resource");
        CommitOutcome::Written
    }
}

/// Writes to a sibling temporary file, then renames it onto `destination`.
async fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), CommitFailure> {
    let temp = temp_path_for(destination);
    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        discard_temp(&temp).await;
        return Err(CommitFailure::io("write", &temp, e));
    }
    if let Err(e) = tokio::fs::rename(&temp, destination).await {
        discard_temp(&temp).await;
        return Err(CommitFailure::io("rename into", destination, e));
    }
    Ok(())
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A short sibling name, independent of the destination's length.
fn temp_path_for(destination: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    destination.with_file_name(format!(".bulkdl.{}.{n}.part", std::process::id()))
}

async fn discard_temp(temp: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %temp.display(), error = %e, "Failed to remove temporary file");
    }
}

/// Sets access and modification time to the submission's creation time.
async fn stamp_creation_time(submission: &Submission, destination: &Path) {
    let Some(created) = submission.created_at() else {
        return;
    };
    let path = destination.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_times(FileTimes::new().set_accessed(created).set_modified(created))
    })
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to set file timestamps"),
        Err(e) => warn!(error = %e, "Timestamp task panicked"),
    }
}
