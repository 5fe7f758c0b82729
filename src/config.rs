//! Config file loading and merging with CLI arguments.
//!
//! The file is a flat list of `key = value` lines; `#` starts a comment
//! outside of quoted strings. Values given on the command line win over the
//! file, and the file wins over built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use harvester_core::download::{DownloadSettings, RetryPolicy};
use harvester_core::parser::UrlPattern;
use harvester_core::pipeline::PipelineConfig;

use crate::cli::Args;

/// Defaults read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Comma-separated in the file: `extensions = "csv,txt"`.
    pub extensions: Option<Vec<String>>,
    pub pattern: Option<UrlPattern>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub body_timeout_ms: Option<u64>,
    /// `0` retries forever.
    pub max_attempts: Option<u32>,
    pub backoff: Option<bool>,
    pub concurrency: Option<u8>,
    pub report: Option<PathBuf>,
}

impl FileConfig {
    /// Validates values against the same ranges the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=16).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=16");
        }
        if let Some(max_attempts) = self.max_attempts
            && max_attempts > 1_000
        {
            bail!("Invalid config value for `max_attempts`: {max_attempts}. Expected range: 0..=1000");
        }
        if let Some(extensions) = &self.extensions
            && extensions.is_empty()
        {
            bail!("Invalid config value for `extensions`: expected at least one extension");
        }
        validate_timeout_ms("connect_timeout_ms", self.connect_timeout_ms, 60_000)?;
        validate_timeout_ms("request_timeout_ms", self.request_timeout_ms, 600_000)?;
        validate_timeout_ms("body_timeout_ms", self.body_timeout_ms, 600_000)?;
        Ok(())
    }
}

fn validate_timeout_ms(field: &str, value: Option<u64>, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..={max}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default location is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<(PathBuf, FileConfig)>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    Ok(Some((path, config)))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
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
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "source" => cfg.source = Some(PathBuf::from(parse_string_literal(value).with_context(context)?)),
            "output" => cfg.output = Some(PathBuf::from(parse_string_literal(value).with_context(context)?)),
            "report" => cfg.report = Some(PathBuf::from(parse_string_literal(value).with_context(context)?)),
            "extensions" => {
                let list = parse_string_literal(value).with_context(context)?;
                cfg.extensions = Some(parse_extension_list(&list));
            }
            "pattern" => {
                let name = parse_string_literal(value).with_context(context)?;
                let pattern = name
                    .parse::<UrlPattern>()
                    .map_err(anyhow::Error::msg)
                    .with_context(context)?;
                cfg.pattern = Some(pattern);
            }
            "connect_timeout_ms" => cfg.connect_timeout_ms = Some(parse_integer_u64(value).with_context(context)?),
            "request_timeout_ms" => cfg.request_timeout_ms = Some(parse_integer_u64(value).with_context(context)?),
            "body_timeout_ms" => cfg.body_timeout_ms = Some(parse_integer_u64(value).with_context(context)?),
            "max_attempts" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_attempts out of range for u32"))
                    .with_context(context)?;
                cfg.max_attempts = Some(n);
            }
            "backoff" => cfg.backoff = Some(parse_boolean(value).with_context(context)?),
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u8::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
                    .with_context(context)?;
                cfg.concurrency = Some(n);
            }
            unknown => bail!("Unknown configuration key: '{unknown}' on line {line_no}"),
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
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
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
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
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Builds the pipeline configuration: CLI, then file, then defaults.
#[must_use]
pub fn resolve_pipeline_config(args: &Args, file: Option<&FileConfig>) -> PipelineConfig {
    let file = file.cloned().unwrap_or_default();
    let defaults = PipelineConfig::default();
    let default_settings = DownloadSettings::default();

    let extensions = if args.extensions.is_empty() {
        file.extensions.unwrap_or(defaults.extensions)
    } else {
        args.extensions.clone()
    };

    let millis = |cli: Option<u64>, from_file: Option<u64>, fallback: Duration| {
        cli.or(from_file).map_or(fallback, Duration::from_millis)
    };
    let settings = DownloadSettings {
        connect_timeout: millis(
            args.connect_timeout_ms,
            file.connect_timeout_ms,
            default_settings.connect_timeout,
        ),
        request_timeout: millis(
            args.request_timeout_ms,
            file.request_timeout_ms,
            default_settings.request_timeout,
        ),
        body_timeout: millis(
            args.body_timeout_ms,
            file.body_timeout_ms,
            default_settings.body_timeout,
        ),
    };

    let mut retry_policy = match args.max_attempts.or(file.max_attempts) {
        Some(max_attempts) => RetryPolicy::with_max_attempts(max_attempts),
        None => RetryPolicy::default(),
    };
    if args.no_backoff || file.backoff == Some(false) {
        retry_policy = retry_policy.without_backoff();
    }

    PipelineConfig {
        source_root: args.source.clone().or(file.source).unwrap_or(defaults.source_root),
        output_dir: args.output.clone().or(file.output).unwrap_or(defaults.output_dir),
        extensions,
        pattern: args.pattern.or(file.pattern).unwrap_or(defaults.pattern),
        settings,
        retry_policy,
        concurrency: args
            .concurrency
            .or(file.concurrency)
            .map_or(defaults.concurrency, usize::from),
    }
}

/// Report path: CLI, then file.
#[must_use]
pub fn resolve_report_path(args: &Args, file: Option<&FileConfig>) -> Option<PathBuf> {
    args.report
        .clone()
        .or_else(|| file.and_then(|f| f.report.clone()))
}
