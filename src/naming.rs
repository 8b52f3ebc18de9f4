//! Destination path formatting for resources.
//!
//! A [`FileNameFormatter`] turns a submission and its resources into concrete
//! paths under an output directory, using `{KEY}` schemes such as
//! `{REDDITOR}_{TITLE}_{POSTID}` for file names and `{SUBREDDIT}` for folders.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::format::{Item, StrftimeItems};
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{error, trace, warn};

use crate::site::Resource;
use crate::submission::Submission;

/// Keys recognised inside a scheme, lowercase.
pub const SCHEME_KEYS: [&str; 7] = [
    "date",
    "flair",
    "postid",
    "redditor",
    "subreddit",
    "title",
    "upvotes",
];

/// Default file name scheme.
pub const DEFAULT_FILE_SCHEME: &str = "{REDDITOR}_{TITLE}_{POSTID}";

/// Default folder scheme.
pub const DEFAULT_FOLDER_SCHEME: &str = "{SUBREDDIT}";

/// Default time format; `ISO` selects ISO 8601 local time.
pub const DEFAULT_TIME_FORMAT: &str = "ISO";

/// Longest file name most filesystems accept, in bytes.
const MAX_FILE_NAME_BYTES: usize = 255;

/// Longest full path accepted.
const MAX_PATH_BYTES: usize = 4096;

#[allow(clippy::expect_used)]
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\{{({})\}}", SCHEME_KEYS.join("|")))
        .expect("scheme key regex is valid")
});

#[allow(clippy::expect_used)]
static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:_\w{6})?$").expect("trailing id regex is valid"));

/// Errors from building or applying a naming scheme.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file scheme names no known key.
    #[error("\"{scheme}\" is not a valid format string")]
    InvalidScheme { scheme: String },

    /// The time format contains an unknown strftime specifier.
    #[error("\"{format}\" is not a valid time format")]
    InvalidTimeFormat { format: String },

    /// The resource carries no extension to end the file name with.
    #[error("resource from {url} has no extension")]
    MissingExtension { url: String },
}

/// Assigns destination paths to a submission's resources.
pub trait PathFormatter: Send + Sync + fmt::Debug {
    /// Pairs each resource with its destination under `destination`.
    ///
    /// Resources that cannot be named are logged and dropped; order of the
    /// remaining resources is preserved.
    fn format_resource_paths(
        &self,
        submission: &Submission,
        resources: Vec<Resource>,
        destination: &Path,
    ) -> Vec<(PathBuf, Resource)>;
}

/// Scheme-driven [`PathFormatter`].
#[derive(Debug, Clone)]
pub struct FileNameFormatter {
    file_scheme: String,
    folder_scheme: Vec<String>,
    time_format: String,
}

impl Default for FileNameFormatter {
    fn default() -> Self {
        Self {
            file_scheme: DEFAULT_FILE_SCHEME.to_string(),
            folder_scheme: vec![DEFAULT_FOLDER_SCHEME.to_string()],
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl FileNameFormatter {
    /// Creates a formatter.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidScheme`] if `file_scheme` contains no
    /// known key, or [`FormatError::InvalidTimeFormat`] if `time_format` is
    /// neither `ISO` nor a valid strftime pattern.
    pub fn new(
        file_scheme: impl Into<String>,
        folder_scheme: &str,
        time_format: impl Into<String>,
    ) -> Result<Self, FormatError> {
        let file_scheme = file_scheme.into();
        if !validate_scheme(&file_scheme) {
            return Err(FormatError::InvalidScheme {
                scheme: file_scheme,
            });
        }

        let time_format = time_format.into();
        if !is_iso(&time_format)
            && StrftimeItems::new(&time_format).any(|item| matches!(item, Item::Error))
        {
            return Err(FormatError::InvalidTimeFormat {
                format: time_format,
            });
        }

        Ok(Self {
            file_scheme,
            folder_scheme: folder_scheme.split('/').map(str::to_string).collect(),
            time_format,
        })
    }

    /// Computes the path for one resource.
    ///
    /// `index` is appended as `_N` before the extension when present.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::MissingExtension`] if the resource has no
    /// extension.
    pub fn format_path(
        &self,
        submission: &Submission,
        resource: &Resource,
        destination: &Path,
        index: Option<usize>,
    ) -> Result<PathBuf, FormatError> {
        let extension = resource
            .extension()
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| FormatError::MissingExtension {
                url: resource.url().to_string(),
            })?;

        let mut folder = destination.to_path_buf();
        for part in &self.folder_scheme {
            let name = self.format_name(submission, part);
            if !name.is_empty() {
                folder.push(name);
            }
        }

        let file_name = self.format_name(submission, &self.file_scheme);
        let index = index.map(|i| format!("_{i}")).unwrap_or_default();
        let ending = if file_name.ends_with('.') {
            format!("{index}{extension}")
        } else {
            format!("{index}.{extension}")
        };

        Ok(limit_file_name_length(&file_name, &ending, &folder))
    }

    fn format_name(&self, submission: &Submission, scheme: &str) -> String {
        let formatted = KEY_PATTERN.replace_all(scheme, |caps: &Captures<'_>| {
            self.key_value(submission, &caps[1].to_lowercase())
        });
        formatted.replace('/', "").replace(['\r', '\n'], " ")
    }

    fn key_value(&self, submission: &Submission, key: &str) -> String {
        match key {
            "date" => self.format_timestamp(submission),
            "flair" => submission.link_flair_text.clone().unwrap_or_default(),
            "postid" => submission.id.clone(),
            "redditor" => submission.author_name().to_string(),
            "subreddit" => submission.subreddit.clone(),
            "title" => submission.title.clone(),
            "upvotes" => submission.score.to_string(),
            _ => String::from("unknown"),
        }
    }

    fn format_timestamp(&self, submission: &Submission) -> String {
        let Some(created) = submission.created_local() else {
            return String::from("unknown");
        };
        let naive = created.naive_local();
        if is_iso(&self.time_format) {
            return naive.format("%Y-%m-%dT%H:%M:%S").to_string();
        }
        let mut out = String::new();
        if write!(out, "{}", naive.format_with_items(StrftimeItems::new(&self.time_format)))
            .is_err()
        {
            return String::from("unknown");
        }
        out
    }
}

impl PathFormatter for FileNameFormatter {
    fn format_resource_paths(
        &self,
        submission: &Submission,
        resources: Vec<Resource>,
        destination: &Path,
    ) -> Vec<(PathBuf, Resource)> {
        let indexed = resources.len() > 1;
        let mut out = Vec::with_capacity(resources.len());
        for (i, resource) in resources.into_iter().enumerate() {
            let index = indexed.then_some(i + 1);
            trace!(index = ?index, url = resource.url(), "Formatting file name");
            match self.format_path(submission, &resource, destination, index) {
                Ok(path) => out.push((path, resource)),
                Err(e) => error!(
                    submission_id = %submission.id,
                    url = resource.url(),
                    error = %e,
                    "Could not generate file path for resource"
                ),
            }
        }
        out
    }
}

/// Whether `scheme` names at least one known key.
///
/// Warns when `{POSTID}` is absent since names may then collide.
#[must_use]
pub fn validate_scheme(scheme: &str) -> bool {
    if scheme.is_empty() || !KEY_PATTERN.is_match(scheme) {
        return false;
    }
    if !scheme.contains("{POSTID}") {
        warn!(
            scheme,
            "File names are not guaranteed to be unique without {{POSTID}}"
        );
    }
    true
}

fn is_iso(time_format: &str) -> bool {
    time_format.trim().eq_ignore_ascii_case("iso")
}

/// Shortens `file_name` so `file_name + ending` fits filesystem limits,
/// keeping any trailing `_xxxxxx` id with the ending.
fn limit_file_name_length(file_name: &str, ending: &str, root: &Path) -> PathBuf {
    let split = TRAILING_ID
        .find(file_name)
        .map_or(file_name.len(), |m| m.start());
    let mut stem = file_name[..split].to_string();
    let ending = format!("{}{ending}", &file_name[split..]);

    let root_len = root.as_os_str().len();
    let name_budget = MAX_FILE_NAME_BYTES.saturating_sub(ending.len());
    let path_budget = MAX_PATH_BYTES
        .saturating_sub(ending.len())
        .saturating_sub(root_len + 1);
    while stem.len() > name_budget || stem.len() > path_budget {
        if stem.pop().is_none() {
            break;
        }
    }
    root.join(format!("{stem}{ending}"))
}
