//! File configuration for run defaults.
//!
//! The file uses a small `key = value` subset of TOML: double-quoted strings,
//! integers, floats, booleans, and flat arrays of strings. `#` starts a
//! comment outside of strings. Unknown keys are rejected.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

/// Application directory name under the config root.
const APP_DIR: &str = "bulkdl";

/// Defaults read from the config file. Every field is optional; command-line
/// values take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Default output directory.
    pub output_dir: Option<PathBuf>,
    /// Submission ids never to download.
    pub exclude_ids: Option<Vec<String>>,
    /// Subreddits to skip.
    pub skip_subreddits: Option<Vec<String>>,
    /// Authors to skip.
    pub ignore_users: Option<Vec<String>>,
    /// Strategy names never to run.
    pub disabled_modules: Option<Vec<String>>,
    /// File extensions never to download.
    pub skip_extensions: Option<Vec<String>>,
    /// Domains never to download from.
    pub skip_domains: Option<Vec<String>>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub min_score_ratio: Option<f64>,
    pub max_score_ratio: Option<f64>,
    /// Per-fetch wait limit in seconds (1..=3600).
    pub max_wait_time: Option<u64>,
    pub no_dupes: Option<bool>,
    pub make_hard_links: Option<bool>,
    pub search_existing: Option<bool>,
    pub direct_links: Option<bool>,
    /// Files hashed concurrently during the existing-file scan (1..=64).
    pub scan_workers: Option<usize>,
    pub file_scheme: Option<String>,
    pub folder_scheme: Option<String>,
    pub time_format: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        validate_ratio("min_score_ratio", self.min_score_ratio)?;
        validate_ratio("max_score_ratio", self.max_score_ratio)?;

        if let Some(wait) = self.max_wait_time
            && !(1..=3600).contains(&wait)
        {
            bail!("Invalid config value for `max_wait_time`: {wait}. Expected range: 1..=3600");
        }

        if let Some(workers) = self.scan_workers
            && !(1..=64).contains(&workers)
        {
            bail!("Invalid config value for `scan_workers`: {workers}. Expected range: 1..=64");
        }

        Ok(())
    }
}

fn validate_ratio(field: &str, value: Option<f64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(0.0..=1.0).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..=1");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path the config was looked up at, if any.
    pub path: Option<PathBuf>,
    /// Parsed config when a file existed and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }

    /// The parsed config, or an empty one.
    #[must_use]
    pub fn into_config(self) -> FileConfig {
        self.config.unwrap_or_default()
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bulkdl/config.toml`
/// 2. `$HOME/.config/bulkdl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given, otherwise from the default path
/// when a file exists there.
///
/// # Errors
///
/// Fails if an explicit path is missing, or if any config file found cannot
/// be read, parsed, or validated.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref().filter(|p| p.exists()) else {
        return Ok(LoadedConfig { path, config: None });
    };
    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

/// Reads and parses one config file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not parse and validate.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses config file contents.
///
/// # Errors
///
/// Fails on syntax errors, unknown keys, bad values, or validation failures.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "exclude_ids" => {
                cfg.exclude_ids = Some(parse_string_array(value).with_context(invalid)?);
            }
            "skip_subreddits" => {
                cfg.skip_subreddits = Some(parse_string_array(value).with_context(invalid)?);
            }
            "ignore_users" => {
                cfg.ignore_users = Some(parse_string_array(value).with_context(invalid)?);
            }
            "disabled_modules" => {
                cfg.disabled_modules = Some(parse_string_array(value).with_context(invalid)?);
            }
            "skip_extensions" => {
                cfg.skip_extensions = Some(parse_string_array(value).with_context(invalid)?);
            }
            "skip_domains" => {
                cfg.skip_domains = Some(parse_string_array(value).with_context(invalid)?);
            }
            "min_score" => {
                cfg.min_score = Some(parse_integer_i64(value).with_context(invalid)?);
            }
            "max_score" => {
                cfg.max_score = Some(parse_integer_i64(value).with_context(invalid)?);
            }
            "min_score_ratio" => {
                cfg.min_score_ratio = Some(parse_float(value).with_context(invalid)?);
            }
            "max_score_ratio" => {
                cfg.max_score_ratio = Some(parse_float(value).with_context(invalid)?);
            }
            "max_wait_time" => {
                cfg.max_wait_time = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "no_dupes" => {
                cfg.no_dupes = Some(parse_boolean(value).with_context(invalid)?);
            }
            "make_hard_links" => {
                cfg.make_hard_links = Some(parse_boolean(value).with_context(invalid)?);
            }
            "search_existing" => {
                cfg.search_existing = Some(parse_boolean(value).with_context(invalid)?);
            }
            "direct_links" => {
                cfg.direct_links = Some(parse_boolean(value).with_context(invalid)?);
            }
            "scan_workers" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let workers = usize::try_from(parsed)
                    .map_err(|_| anyhow!("scan_workers out of range for usize"))?;
                cfg.scan_workers = Some(workers);
            }
            "file_scheme" => {
                cfg.file_scheme = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "folder_scheme" => {
                cfg.folder_scheme = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "time_format" => {
                cfg.time_format = Some(parse_string_literal(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    let raw_value = raw_value.trim();
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    let inner = &raw_value[1..raw_value.len() - 1];
    if inner.contains('"') {
        bail!("Unexpected quote inside string");
    }
    Ok(inner.to_string())
}

fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let raw_value = raw_value.trim();
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of strings, e.g. [\"a\", \"b\"]");
    };
    split_outside_strings(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_string_literal)
        .collect()
}

/// Splits on `separator` wherever it is not inside a double-quoted string.
fn split_outside_strings(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (index, ch) in value.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            c if c == separator && !in_string => {
                parts.push(&value[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn parse_integer_i64(raw_value: &str) -> Result<i64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    Ok(token.parse::<i64>()?)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow!("Integer value out of range for u64"))
}

fn parse_float(raw_value: &str) -> Result<f64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    let value = token.parse::<f64>()?;
    if !value.is_finite() {
        bail!("Expected finite number");
    }
    Ok(value)
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
