//! Submission listing sources.
//!
//! The pipeline pulls submissions one at a time from a [`SubmissionSource`]
//! and never buffers ahead. [`JsonLinesSource`] reads one JSON object per line
//! from a file; [`VecSource`] serves an in-memory list.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::submission::Submission;

/// Errors produced while reading a listing.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The listing could not be opened.
    #[error("cannot open listing {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from the listing failed.
    #[error("failed reading listing {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line is not a valid submission.
    #[error("invalid submission at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether the source can keep producing after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Lazily yields submissions.
#[async_trait]
pub trait SubmissionSource: Send {
    /// The next submission, an error for an unusable entry, or `None` when
    /// the listing is exhausted.
    async fn next_submission(&mut self) -> Option<Result<Submission, SourceError>>;
}

/// Reads submissions from a JSON-lines file. Blank lines are ignored.
#[derive(Debug)]
pub struct JsonLinesSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    finished: bool,
}

impl JsonLinesSource {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Open`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line: 0,
            finished: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubmissionSource for JsonLinesSource {
    async fn next_submission(&mut self) -> Option<Result<Submission, SourceError>> {
        while !self.finished {
            let raw = match self.lines.next_line().await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(source) => {
                    self.finished = true;
                    return Some(Err(SourceError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            self.line += 1;
            if raw.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                }),
            );
        }
        None
    }
}

/// Serves submissions from memory, in order.
#[derive(Debug, Default, Clone)]
pub struct VecSource {
    items: VecDeque<Submission>,
}

impl VecSource {
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = Submission>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SubmissionSource for VecSource {
    async fn next_submission(&mut self) -> Option<Result<Submission, SourceError>> {
        self.items.pop_front().map(Ok)
    }
}

/// Drains several sources one after another.
pub struct ChainedSource {
    sources: VecDeque<Box<dyn SubmissionSource>>,
}

impl ChainedSource {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn SubmissionSource>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }
}

#[async_trait]
impl SubmissionSource for ChainedSource {
    async fn next_submission(&mut self) -> Option<Result<Submission, SourceError>> {
        while let Some(source) = self.sources.front_mut() {
            if let Some(item) = source.next_submission().await {
                return Some(item);
            }
            self.sources.pop_front();
        }
        None
    }
}
