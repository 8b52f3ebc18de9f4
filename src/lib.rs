//! bulkdl Core Library
//!
//! This library provides the submission-processing pipeline behind the
//! `bulkdl` archiver: for each submission pulled from a listing it decides
//! whether to skip it, picks an extraction strategy, fetches the resulting
//! resources, and places them on disk with content-hash deduplication.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`site`] - Strategy registry, URL normalization, extraction strategies
//! - [`filter`] - Ordered submission filter and download filter
//! - [`commit`] - Per-resource fetch, dedup, and crash-safe write
//! - [`index`] - Content-hash index and existing-file scan
//! - [`naming`] - Destination path formatting
//! - [`downloader`] - Run orchestration
//! - [`source`] - Submission listing sources
//! - [`download`] - HTTP client used for remote resources
//! - [`config`] - Config file loading

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commit;
pub mod config;
pub mod download;
pub mod downloader;
pub mod filter;
pub mod hash;
pub mod index;
pub mod naming;
pub mod site;
pub mod source;
pub mod submission;
mod user_agent;

// Re-export commonly used types
pub use commit::{CommitFailure, CommitOutcome, CommitSettings, ResourceCommitter};
pub use download::{FetchError, FetchedContent, HttpClient};
pub use downloader::{
    Downloader, DownloaderSettings, ResourceTally, RunStats, SubmissionOutcome,
};
pub use filter::{
    DownloadFilter, ExtensionDomainFilter, FilterDecision, FilterSettings, RejectReason,
    SubmissionFilter,
};
pub use hash::ContentHash;
pub use index::{HashIndex, ScanError, scan_existing_files};
pub use naming::{FileNameFormatter, FormatError, PathFormatter};
pub use site::{
    DispatchError, RegistryOptions, Resource, SiteContext, SiteDownloader, SiteDownloaderError,
    StrategyKind, StrategyRegistry,
};
pub use source::{JsonLinesSource, SourceError, SubmissionSource, VecSource};
pub use submission::{Submission, SubmissionKind};
