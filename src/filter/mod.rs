//! Submission and download filters.
//!
//! - [`SubmissionFilter`] - ordered, short-circuiting checks on a submission
//! - [`DownloadFilter`] - URL/resource predicates supplied by configuration
//! - [`ExtensionDomainFilter`] - the shipped [`DownloadFilter`]

mod download_filter;
mod pipeline;

pub use download_filter::{DownloadFilter, ExtensionDomainFilter};
pub use pipeline::{FilterDecision, FilterSettings, RejectReason, SubmissionFilter};
