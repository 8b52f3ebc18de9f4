//! CLI argument definitions using clap derive macros.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use bulkdl_core::commit::CommitSettings;
use bulkdl_core::config::FileConfig;
use bulkdl_core::download::DEFAULT_MAX_WAIT;
use bulkdl_core::filter::FilterSettings;
use bulkdl_core::index::DEFAULT_SCAN_WORKERS;
use bulkdl_core::naming::{
    DEFAULT_FILE_SCHEME, DEFAULT_FOLDER_SCHEME, DEFAULT_TIME_FORMAT, FileNameFormatter,
};
use bulkdl_core::site::RegistryOptions;
use bulkdl_core::DownloaderSettings;

/// Archive submissions from JSON-lines listings into a local directory.
///
/// Each submission is filtered, matched to an extraction strategy, and its
/// resources are written under the output directory with content-hash
/// deduplication.
#[derive(Parser, Debug)]
#[command(name = "bulkdl")]
#[command(author, version, about)]
pub struct Args {
    /// Output directory (defaults to the config file value, then `.`)
    pub directory: Option<PathBuf>,

    /// JSON-lines listing file, one submission per line (repeatable)
    #[arg(short, long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Submission id to skip (repeatable)
    #[arg(long = "exclude-id", value_name = "ID")]
    pub exclude_ids: Vec<String>,

    /// Subreddit to skip, case-insensitive (repeatable)
    #[arg(long = "skip-subreddit", value_name = "NAME")]
    pub skip_subreddits: Vec<String>,

    /// Author to skip; `DELETED` matches deleted authors (repeatable)
    #[arg(long = "ignore-user", value_name = "NAME")]
    pub ignore_users: Vec<String>,

    /// Extraction strategy to disable, e.g. `selfpost` (repeatable)
    #[arg(long = "disable-module", value_name = "NAME")]
    pub disabled_modules: Vec<String>,

    /// Skip submissions scoring below this
    #[arg(long, allow_hyphen_values = true)]
    pub min_score: Option<i64>,

    /// Skip submissions scoring above this
    #[arg(long, allow_hyphen_values = true)]
    pub max_score: Option<i64>,

    /// Skip submissions with an upvote ratio below this (0-1)
    #[arg(long, value_parser = parse_ratio)]
    pub min_score_ratio: Option<f64>,

    /// Skip submissions with an upvote ratio above this (0-1)
    #[arg(long, value_parser = parse_ratio)]
    pub max_score_ratio: Option<f64>,

    /// Maximum seconds to wait for a single fetch (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub max_wait_time: Option<u64>,

    /// Skip content already present in the output tree
    #[arg(long)]
    pub no_dupes: bool,

    /// Hard-link content already present in the output tree
    #[arg(long)]
    pub make_hard_links: bool,

    /// Hash the existing output tree before downloading
    #[arg(long)]
    pub search_existing: bool,

    /// Download file-shaped URLs directly
    #[arg(long)]
    pub direct_links: bool,

    /// File extension never to download (repeatable)
    #[arg(long = "skip", value_name = "EXT")]
    pub skip_extensions: Vec<String>,

    /// Domain never to download from (repeatable)
    #[arg(long = "skip-domain", value_name = "DOMAIN")]
    pub skip_domains: Vec<String>,

    /// File name scheme, e.g. `{REDDITOR}_{TITLE}_{POSTID}`
    #[arg(long)]
    pub file_scheme: Option<String>,

    /// Folder scheme, `/`-separated, e.g. `{SUBREDDIT}`
    #[arg(long)]
    pub folder_scheme: Option<String>,

    /// `ISO` or a strftime pattern for `{DATE}`
    #[arg(long)]
    pub time_format: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_ratio(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=1"))
    }
}

/// Everything needed to start a run, after merging CLI and file values.
#[derive(Debug)]
pub struct RunPlan {
    pub settings: DownloaderSettings,
    pub inputs: Vec<PathBuf>,
    pub skip_extensions: Vec<String>,
    pub skip_domains: Vec<String>,
    pub formatter: FileNameFormatter,
}

impl Args {
    /// Default log level; `RUST_LOG` still wins when set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Merges CLI values over `file` over built-in defaults.
    ///
    /// # Errors
    ///
    /// Fails if the naming scheme or time format is invalid.
    pub fn into_plan(self, file: FileConfig) -> Result<RunPlan> {
        let no_dupes = self.no_dupes || file.no_dupes.unwrap_or(false);
        let make_hard_links = self.make_hard_links || file.make_hard_links.unwrap_or(false);

        let formatter = FileNameFormatter::new(
            self.file_scheme
                .or(file.file_scheme)
                .unwrap_or_else(|| DEFAULT_FILE_SCHEME.to_string()),
            self.folder_scheme
                .or(file.folder_scheme)
                .as_deref()
                .unwrap_or(DEFAULT_FOLDER_SCHEME),
            self.time_format
                .or(file.time_format)
                .unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string()),
        )
        .context("Invalid naming configuration")?;

        let filter = FilterSettings {
            excluded_ids: merge_list(self.exclude_ids, file.exclude_ids),
            skip_subreddits: merge_list(self.skip_subreddits, file.skip_subreddits),
            ignored_users: merge_list(self.ignore_users, file.ignore_users),
            min_score: self.min_score.or(file.min_score),
            max_score: self.max_score.or(file.max_score),
            min_score_ratio: self.min_score_ratio.or(file.min_score_ratio),
            max_score_ratio: self.max_score_ratio.or(file.max_score_ratio),
        };

        let max_wait = self
            .max_wait_time
            .or(file.max_wait_time)
            .map_or(DEFAULT_MAX_WAIT, Duration::from_secs);

        let settings = DownloaderSettings {
            output_dir: self
                .directory
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            filter,
            disabled_modules: merge_list(self.disabled_modules, file.disabled_modules),
            commit: CommitSettings {
                no_dupes,
                make_hard_links,
                max_wait,
            },
            search_existing: self.search_existing || file.search_existing.unwrap_or(false),
            scan_workers: file.scan_workers.unwrap_or(DEFAULT_SCAN_WORKERS),
            registry: RegistryOptions {
                direct_links: self.direct_links || file.direct_links.unwrap_or(false),
            },
        };

        Ok(RunPlan {
            settings,
            inputs: self.inputs,
            skip_extensions: pick_list(self.skip_extensions, file.skip_extensions),
            skip_domains: pick_list(self.skip_domains, file.skip_domains),
            formatter,
        })
    }
}

/// CLI list if given, otherwise the file list.
fn pick_list(cli: Vec<String>, file: Option<Vec<String>>) -> Vec<String> {
    if cli.is_empty() {
        file.unwrap_or_default()
    } else {
        cli
    }
}

fn merge_list(cli: Vec<String>, file: Option<Vec<String>>) -> HashSet<String> {
    pick_list(cli, file).into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["bulkdl"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.directory.is_none());
        assert!(args.inputs.is_empty());
        assert!(!args.no_dupes);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["bulkdl", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");

        let args = Args::try_parse_from(["bulkdl", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "debug");
    }

    #[test]
    fn test_cli_quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["bulkdl", "-q", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["bulkdl", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["bulkdl", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_repeatable_lists() {
        let args = Args::try_parse_from([
            "bulkdl",
            "out",
            "-i",
            "a.jsonl",
            "--input",
            "b.jsonl",
            "--skip-subreddit",
            "pics",
            "--skip-subreddit",
            "funny",
            "--skip",
            "mp4",
        ])
        .unwrap();
        assert_eq!(args.directory, Some(PathBuf::from("out")));
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.skip_subreddits, vec!["pics", "funny"]);
        assert_eq!(args.skip_extensions, vec!["mp4"]);
    }

    #[test]
    fn test_cli_negative_score_accepted() {
        let args = Args::try_parse_from(["bulkdl", "--min-score", "-5"]).unwrap();
        assert_eq!(args.min_score, Some(-5));
    }

    #[test]
    fn test_cli_ratio_out_of_range_rejected() {
        let err = Args::try_parse_from(["bulkdl", "--min-score-ratio", "1.5"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_wait_zero_rejected() {
        let err = Args::try_parse_from(["bulkdl", "--max-wait-time", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_plan_uses_defaults() {
        let args = Args::try_parse_from(["bulkdl"]).unwrap();
        let plan = args.into_plan(FileConfig::default()).unwrap();
        assert_eq!(plan.settings.output_dir, PathBuf::from("."));
        assert_eq!(plan.settings.commit.max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(plan.settings.scan_workers, DEFAULT_SCAN_WORKERS);
        assert!(!plan.settings.registry.direct_links);
        assert!(plan.settings.filter.min_score.is_none());
    }

    #[test]
    fn test_plan_cli_overrides_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/from/file")),
            min_score: Some(1),
            max_score: Some(500),
            skip_subreddits: Some(vec!["file_sub".to_string()]),
            max_wait_time: Some(10),
            ..FileConfig::default()
        };
        let args = Args::try_parse_from([
            "bulkdl",
            "/from/cli",
            "--min-score",
            "10",
            "--skip-subreddit",
            "cli_sub",
        ])
        .unwrap();

        let plan = args.into_plan(file).unwrap();

        assert_eq!(plan.settings.output_dir, PathBuf::from("/from/cli"));
        assert_eq!(plan.settings.filter.min_score, Some(10));
        assert_eq!(plan.settings.filter.max_score, Some(500));
        assert!(plan.settings.filter.skip_subreddits.contains("cli_sub"));
        assert!(!plan.settings.filter.skip_subreddits.contains("file_sub"));
        assert_eq!(plan.settings.commit.max_wait, Duration::from_secs(10));
    }

    #[test]
    fn test_plan_flags_combine_with_file() {
        let args = Args::try_parse_from(["bulkdl", "--no-dupes"]).unwrap();
        let file = FileConfig {
            search_existing: Some(true),
            direct_links: Some(true),
            ..FileConfig::default()
        };
        let plan = args.into_plan(file).unwrap();
        assert!(plan.settings.commit.no_dupes);
        assert!(!plan.settings.commit.make_hard_links);
        assert!(plan.settings.search_existing);
        assert!(plan.settings.registry.direct_links);
    }

    #[test]
    fn test_plan_rejects_invalid_file_scheme() {
        let args = Args::try_parse_from(["bulkdl", "--file-scheme", "static"]).unwrap();
        let err = args.into_plan(FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("naming"));
    }
}
