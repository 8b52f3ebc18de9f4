//! Submission model consumed by the download pipeline.
//!
//! A [`Submission`] is produced by a listing source and is read-only from the
//! pipeline's point of view. Only the fields the filters, strategies, and name
//! formatter need are modelled.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Sentinel author name used for submissions whose author was deleted.
pub const DELETED_AUTHOR: &str = "DELETED";

/// What kind of item a listing produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// A content-bearing post (link or self post).
    #[default]
    Post,
    /// A comment that ended up in a submission stream.
    Comment,
    /// Anything else the listing could not classify.
    Other,
}

/// A single content item discovered from a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Feed-unique identifier (e.g. `abc123`).
    pub id: String,
    /// Parent feed name, as displayed by the feed.
    pub subreddit: String,
    /// Author name; `None` when the author account was deleted.
    #[serde(default)]
    pub author: Option<String>,
    /// Net score.
    #[serde(default)]
    pub score: i64,
    /// Fraction of votes that were upvotes, `0.0..=1.0`.
    #[serde(default = "default_upvote_ratio")]
    pub upvote_ratio: f64,
    /// Creation time in unix seconds.
    #[serde(default)]
    pub created_utc: f64,
    /// Source URL the submission points at.
    pub url: String,
    /// Item type tag.
    #[serde(default)]
    pub kind: SubmissionKind,
    /// Post title.
    #[serde(default)]
    pub title: String,
    /// Self-post body (markdown), empty for link posts.
    #[serde(default)]
    pub selftext: String,
    /// Flair text, if any.
    #[serde(default)]
    pub link_flair_text: Option<String>,
    /// Feed-relative permalink.
    #[serde(default)]
    pub permalink: Option<String>,
}

fn default_upvote_ratio() -> f64 {
    1.0
}

impl Submission {
    /// Creates a post with neutral defaults for every optional field.
    #[must_use]
    pub fn new(id: impl Into<String>, subreddit: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subreddit: subreddit.into(),
            author: None,
            score: 0,
            upvote_ratio: default_upvote_ratio(),
            created_utc: 0.0,
            url: url.into(),
            kind: SubmissionKind::Post,
            title: String::new(),
            selftext: String::new(),
            link_flair_text: None,
            permalink: None,
        }
    }

    /// Returns the author name, or [`DELETED_AUTHOR`] when there is none.
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.author.as_deref().unwrap_or(DELETED_AUTHOR)
    }

    /// Creation time as a [`SystemTime`], if the timestamp is representable.
    #[must_use]
    pub fn created_at(&self) -> Option<SystemTime> {
        let since_epoch = Duration::try_from_secs_f64(self.created_utc).ok()?;
        UNIX_EPOCH.checked_add(since_epoch)
    }

    /// Creation time in the local timezone.
    #[must_use]
    pub fn created_local(&self) -> Option<DateTime<Local>> {
        if !self.created_utc.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let secs = self.created_utc.trunc() as i64;
        Local.timestamp_opt(secs, 0).single()
    }

    /// Whether this item carries downloadable content.
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.kind == SubmissionKind::Post
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_submission_uses_defaults() {
        let raw = r#"{"id":"abc123","subreddit":"test","url":"https://reddit.com/r/test/abc123"}"#;
        let submission: Submission = serde_json::from_str(raw).unwrap();
        assert_eq!(submission.id, "abc123");
        assert_eq!(submission.kind, SubmissionKind::Post);
        assert!(submission.author.is_none());
        assert!((submission.upvote_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_comment_kind() {
        let raw = r#"{"id":"c1","subreddit":"test","url":"x","kind":"comment"}"#;
        let submission: Submission = serde_json::from_str(raw).unwrap();
        assert_eq!(submission.kind, SubmissionKind::Comment);
        assert!(!submission.is_post());
    }

    #[test]
    fn test_author_name_falls_back_to_deleted() {
        let mut submission = Submission::new("a", "b", "c");
        assert_eq!(submission.author_name(), DELETED_AUTHOR);
        submission.author = Some("someone".to_string());
        assert_eq!(submission.author_name(), "someone");
    }

    #[test]
    fn test_created_at_converts_unix_seconds() {
        let mut submission = Submission::new("a", "b", "c");
        submission.created_utc = 1_600_000_000.0;
        let created = submission.created_at().unwrap();
        assert_eq!(
            created.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            1_600_000_000
        );
    }

    #[test]
    fn test_created_at_rejects_negative_timestamp() {
        let mut submission = Submission::new("a", "b", "c");
        submission.created_utc = -5.0;
        assert!(submission.created_at().is_none());
    }

    #[test]
    fn test_created_at_rejects_unrepresentable_timestamps() {
        let mut submission = Submission::new("a", "b", "c");
        for value in [1e30, f64::MAX, f64::INFINITY, f64::NAN] {
            submission.created_utc = value;
            assert!(submission.created_at().is_none(), "{value}");
            assert!(submission.created_local().is_none(), "{value}");
        }
    }
}
