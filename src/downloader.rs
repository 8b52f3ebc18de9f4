//! Run orchestration: filter, dispatch, extract, name, and commit.
//!
//! A [`Downloader`] owns every piece of per-run state, most importantly the
//! [`HashIndex`]. Submissions are processed strictly one after another and
//! each submission's resources in order, so the index is mutated without
//! locking.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::commit::{CommitOutcome, CommitSettings, ResourceCommitter};
use crate::filter::{
    DownloadFilter, FilterDecision, FilterSettings, RejectReason, SubmissionFilter,
};
use crate::index::{DEFAULT_SCAN_WORKERS, HashIndex, ScanError, scan_existing_files};
use crate::naming::PathFormatter;
use crate::site::{RegistryOptions, SiteContext, StrategyKind, StrategyRegistry};
use crate::source::SubmissionSource;
use crate::submission::Submission;

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone)]
pub struct DownloaderSettings {
    /// Root of the output tree.
    pub output_dir: PathBuf,
    pub filter: FilterSettings,
    /// Strategy names (lowercase) never to run.
    pub disabled_modules: HashSet<String>,
    pub commit: CommitSettings,
    /// Seed the hash index from `output_dir` before processing.
    pub search_existing: bool,
    pub scan_workers: usize,
    pub registry: RegistryOptions,
}

impl DownloaderSettings {
    /// Settings with every option at its default, writing under `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            filter: FilterSettings::default(),
            disabled_modules: HashSet::new(),
            commit: CommitSettings::default(),
            search_existing: false,
            scan_workers: DEFAULT_SCAN_WORKERS,
            registry: RegistryOptions::default(),
        }
    }
}

/// Per-resource counts for one submission or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceTally {
    pub written: usize,
    pub linked: usize,
    pub skipped_existing: usize,
    pub skipped_filtered: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl ResourceTally {
    fn record(&mut self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Written => self.written += 1,
            CommitOutcome::Linked { .. } => self.linked += 1,
            CommitOutcome::SkippedExists => self.skipped_existing += 1,
            CommitOutcome::SkippedFiltered => self.skipped_filtered += 1,
            CommitOutcome::SkippedDuplicate { .. } => self.duplicates += 1,
            CommitOutcome::Failed(_) => self.failed += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.written += other.written;
        self.linked += other.linked;
        self.skipped_existing += other.skipped_existing;
        self.skipped_filtered += other.skipped_filtered;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Rejected by the filter pipeline; dispatch never ran.
    Filtered(RejectReason),
    /// No strategy claims the URL.
    NoStrategy,
    /// The selected strategy is disabled.
    Disabled(StrategyKind),
    /// The strategy failed to produce resources.
    ExtractionFailed(StrategyKind),
    /// Resources were committed (possibly none).
    Processed {
        strategy: StrategyKind,
        resources: ResourceTally,
        /// Whether remaining resources were abandoned.
        aborted: bool,
    },
}

/// Totals for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub submissions: usize,
    pub filtered: usize,
    pub no_strategy: usize,
    pub disabled: usize,
    pub extraction_failed: usize,
    pub processed: usize,
    /// Listing entries that could not be read.
    pub source_errors: usize,
    pub resources: ResourceTally,
}

impl RunStats {
    /// Adds one submission's outcome.
    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        self.submissions += 1;
        match outcome {
            SubmissionOutcome::Filtered(_) => self.filtered += 1,
            SubmissionOutcome::NoStrategy => self.no_strategy += 1,
            SubmissionOutcome::Disabled(_) => self.disabled += 1,
            SubmissionOutcome::ExtractionFailed(_) => self.extraction_failed += 1,
            SubmissionOutcome::Processed { resources, .. } => {
                self.processed += 1;
                self.resources.merge(resources);
            }
        }
    }
}

/// Drives submissions through the pipeline.
#[derive(Debug)]
pub struct Downloader {
    output_dir: PathBuf,
    filter: SubmissionFilter,
    registry: StrategyRegistry,
    disabled_modules: HashSet<String>,
    committer: ResourceCommitter,
    formatter: Box<dyn PathFormatter>,
    context: SiteContext,
    index: HashIndex,
}

impl Downloader {
    /// Builds a downloader, scanning the output tree first when
    /// `search_existing` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the existing-file scan cannot read
    /// `output_dir`.
    pub async fn new(
        settings: DownloaderSettings,
        download_filter: Arc<dyn DownloadFilter>,
        formatter: Box<dyn PathFormatter>,
        context: SiteContext,
    ) -> Result<Self, ScanError> {
        let index = if settings.search_existing {
            scan_existing_files(&settings.output_dir, settings.scan_workers).await?
        } else {
            HashIndex::new()
        };

        Ok(Self {
            filter: SubmissionFilter::new(settings.filter, Arc::clone(&download_filter)),
            registry: StrategyRegistry::with_defaults(settings.registry),
            disabled_modules: settings
                .disabled_modules
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            committer: ResourceCommitter::new(settings.commit, download_filter),
            output_dir: settings.output_dir,
            formatter,
            context,
            index,
        })
    }

    /// Replaces the dispatch table.
    #[must_use]
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn hash_index(&self) -> &HashIndex {
        &self.index
    }

    /// Pulls every submission from `source` and processes it.
    ///
    /// Nothing that happens to a single submission stops the run. Listing
    /// entries that fail to parse are logged and skipped.
    #[instrument(skip_all, fields(output_dir = %self.output_dir.display()))]
    pub async fn run(&mut self, source: &mut dyn SubmissionSource) -> RunStats {
        let mut stats = RunStats::default();
        while let Some(item) = source.next_submission().await {
            match item {
                Ok(submission) => {
                    let outcome = self.process_submission(&submission).await;
                    stats.record(&outcome);
                }
                Err(e) => {
                    stats.source_errors += 1;
                    if e.is_recoverable() {
                        warn!(error = %e, "Skipping unreadable listing entry");
                    } else {
                        error!(error = %e, "Listing failed");
                    }
                }
            }
        }

        info!(
            submissions = stats.submissions,
            processed = stats.processed,
            written = stats.resources.written,
            failed = stats.resources.failed,
            "Run complete"
        );
        stats
    }

    /// Runs one submission through filter, dispatch, extraction, naming and
    /// commit.
    #[instrument(skip_all, fields(submission_id = %submission.id))]
    pub async fn process_submission(&mut self, submission: &Submission) -> SubmissionOutcome {
        if let FilterDecision::Reject(reason) = self.filter.evaluate(submission) {
            if matches!(reason, RejectReason::NotAPost { .. }) {
                warn!(reason = %reason, "Submission is not a post, skipping");
            } else {
                debug!(reason = %reason, "Submission filtered");
            }
            return SubmissionOutcome::Filtered(reason);
        }

        let kind = match self.registry.select(&submission.url) {
            Ok(kind) => kind,
            Err(e) => {
                debug!(error = %e, "No downloader module for submission");
                return SubmissionOutcome::NoStrategy;
            }
        };

        if self.disabled_modules.contains(kind.name()) {
            debug!(strategy = kind.name(), "Strategy disabled, skipping");
            return SubmissionOutcome::Disabled(kind);
        }

        let resources = match kind
            .strategy()
            .find_resources(submission, &self.context)
            .await
        {
            Ok(resources) => resources,
            Err(e) => {
                error!(strategy = kind.name(), error = %e, "Strategy failed to extract submission");
                return SubmissionOutcome::ExtractionFailed(kind);
            }
        };

        let paths = self
            .formatter
            .format_resource_paths(submission, resources, &self.output_dir);

        let mut tally = ResourceTally::default();
        let mut aborted = false;
        for (path, resource) in paths {
            let outcome = self
                .committer
                .commit(submission, resource, &path, &mut self.index)
                .await;
            tally.record(&outcome);
            if outcome.aborts_submission() {
                aborted = true;
                break;
            }
        }

        debug!(
            strategy = kind.name(),
            written = tally.written,
            aborted,
            "Submission processed"
        );
        SubmissionOutcome::Processed {
            strategy: kind,
            resources: tally,
            aborted,
        }
    }
}
