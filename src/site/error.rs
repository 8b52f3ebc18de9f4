//! Error types for strategy dispatch and resource extraction.

use thiserror::Error;

/// Errors raised while selecting a strategy for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No registered rule produces a strategy for the URL.
    #[error("no strategy can download '{url}' (normalized '{normalized}')")]
    NoStrategy {
        /// The URL as found on the submission.
        url: String,
        /// The normalized form the rules were tested against.
        normalized: String,
    },
}

impl DispatchError {
    /// Creates a `NoStrategy` error.
    #[must_use]
    pub fn no_strategy(url: &str, normalized: &str) -> Self {
        Self::NoStrategy {
            url: url.to_string(),
            normalized: normalized.to_string(),
        }
    }
}

/// Errors raised inside an extraction strategy.
///
/// The pipeline handles every variant the same way: log and skip the
/// submission.
#[derive(Debug, Error)]
pub enum SiteDownloaderError {
    /// The strategy could not turn the submission into resources.
    #[error("{strategy} could not extract resources from '{url}': {reason}")]
    Extraction {
        /// Strategy name.
        strategy: String,
        /// Submission URL.
        url: String,
        /// Why extraction failed.
        reason: String,
    },
}

impl SiteDownloaderError {
    /// Creates an `Extraction` error.
    #[must_use]
    pub fn extraction(strategy: &str, url: &str, reason: impl Into<String>) -> Self {
        Self::Extraction {
            strategy: strategy.to_string(),
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
