//! Ordered submission filter pipeline.
//!
//! Checks run cheapest/most-likely-to-reject first and stop at the first
//! rejection. Unset or zero thresholds are inactive.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{DownloadFilter, ExtensionDomainFilter};
use crate::submission::{DELETED_AUTHOR, Submission, SubmissionKind};

/// Thresholds and exclusion sets consulted by [`SubmissionFilter`].
#[derive(Debug, Clone, Default)]
pub struct FilterSettings {
    /// Submission ids never to download.
    pub excluded_ids: HashSet<String>,
    /// Feeds to skip, compared case-insensitively.
    pub skip_subreddits: HashSet<String>,
    /// Authors to skip; [`DELETED_AUTHOR`] matches submissions without one.
    pub ignored_users: HashSet<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub min_score_ratio: Option<f64>,
    pub max_score_ratio: Option<f64>,
}

/// Why a submission was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    ExcludedId,
    SkippedSubreddit { subreddit: String },
    IgnoredUser { author: String },
    ScoreBelowMinimum { score: i64, min: i64 },
    ScoreAboveMaximum { score: i64, max: i64 },
    ScoreRatioOutOfBounds { ratio: f64 },
    NotAPost { kind: SubmissionKind },
    UrlFiltered { url: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludedId => write!(f, "in exclusion list"),
            Self::SkippedSubreddit { subreddit } => write!(f, "subreddit {subreddit} in skip list"),
            Self::IgnoredUser { author } => write!(f, "{author} is an ignored user"),
            Self::ScoreBelowMinimum { score, min } => write!(f, "score {score} < [{min}]"),
            Self::ScoreAboveMaximum { score, max } => write!(f, "score [{max}] < {score}"),
            Self::ScoreRatioOutOfBounds { ratio } => write!(f, "score ratio ({ratio})"),
            Self::NotAPost { kind } => write!(f, "not a submission ({kind:?})"),
            Self::UrlFiltered { url } => write!(f, "URL {url} rejected by download filter"),
        }
    }
}

/// Outcome of [`SubmissionFilter::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Decides whether a submission should be processed at all.
#[derive(Debug, Clone)]
pub struct SubmissionFilter {
    settings: FilterSettings,
    download_filter: Arc<dyn DownloadFilter>,
}

impl SubmissionFilter {
    /// Creates a pipeline; skip-list feed names are folded to lowercase.
    #[must_use]
    pub fn new(mut settings: FilterSettings, download_filter: Arc<dyn DownloadFilter>) -> Self {
        settings.skip_subreddits = settings
            .skip_subreddits
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        Self {
            settings,
            download_filter,
        }
    }

    /// A pipeline with the given settings and an accept-all download filter.
    #[must_use]
    pub fn with_settings(settings: FilterSettings) -> Self {
        Self::new(settings, Arc::new(ExtensionDomainFilter::default()))
    }

    #[must_use]
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    #[must_use]
    pub fn download_filter(&self) -> &Arc<dyn DownloadFilter> {
        &self.download_filter
    }

    /// Runs every check in order, returning the first rejection.
    #[must_use]
    pub fn evaluate(&self, submission: &Submission) -> FilterDecision {
        match self.first_rejection(submission) {
            Some(reason) => FilterDecision::Reject(reason),
            None => FilterDecision::Accept,
        }
    }

    /// Boolean view of [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn should_process(&self, submission: &Submission) -> bool {
        self.evaluate(submission).is_accept()
    }

    fn first_rejection(&self, submission: &Submission) -> Option<RejectReason> {
        let settings = &self.settings;

        if settings.excluded_ids.contains(&submission.id) {
            return Some(RejectReason::ExcludedId);
        }

        if settings
            .skip_subreddits
            .contains(&submission.subreddit.to_lowercase())
        {
            return Some(RejectReason::SkippedSubreddit {
                subreddit: submission.subreddit.clone(),
            });
        }

        let author = submission.author.as_deref().unwrap_or(DELETED_AUTHOR);
        if settings.ignored_users.contains(author) {
            return Some(RejectReason::IgnoredUser {
                author: author.to_string(),
            });
        }

        if let Some(min) = active(settings.min_score)
            && submission.score < min
        {
            return Some(RejectReason::ScoreBelowMinimum {
                score: submission.score,
                min,
            });
        }

        if let Some(max) = active(settings.max_score)
            && submission.score > max
        {
            return Some(RejectReason::ScoreAboveMaximum {
                score: submission.score,
                max,
            });
        }

        let ratio = submission.upvote_ratio;
        let below = active_ratio(settings.min_score_ratio).is_some_and(|min| ratio < min);
        let above = active_ratio(settings.max_score_ratio).is_some_and(|max| ratio > max);
        if below || above {
            return Some(RejectReason::ScoreRatioOutOfBounds { ratio });
        }

        if !submission.is_post() {
            return Some(RejectReason::NotAPost {
                kind: submission.kind,
            });
        }

        if !self.download_filter.check_url(&submission.url) {
            return Some(RejectReason::UrlFiltered {
                url: submission.url.clone(),
            });
        }

        None
    }
}

fn active(threshold: Option<i64>) -> Option<i64> {
    threshold.filter(|value| *value != 0)
}

fn active_ratio(threshold: Option<f64>) -> Option<f64> {
    threshold.filter(|value| *value != 0.0)
}
