//! CLI argument definitions using clap derive macros.
//!
//! Options that can also come from the config file are `Option`s here, so an
//! omitted flag falls through to the file and then to the built-in default.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::parser::UrlPattern;

/// Harvest media attachment links from exported chat logs and download them.
///
/// Every `.csv` file under the source directory is scanned line by line for
/// attachment URLs, and each match is downloaded into the output directory
/// as `<uuid>_<original name>`.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory scanned recursively for exported logs [default: data]
    #[arg(short = 's', long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory downloads are written to [default: image-output]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// File extension to scan; repeat for several [default: csv]
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Which links to harvest: `strict` (images only) or `loose` (any attachment) [default: strict]
    #[arg(short = 'p', long)]
    pub pattern: Option<UrlPattern>,

    /// TCP/TLS connect timeout in milliseconds [default: 1000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    pub connect_timeout_ms: Option<u64>,

    /// Maximum wait for response headers in milliseconds [default: 10000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub request_timeout_ms: Option<u64>,

    /// Deadline for receiving the whole body in milliseconds [default: 1000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub body_timeout_ms: Option<u64>,

    /// Attempts per URL, including the first; 0 retries forever [default: 5]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=1_000))]
    pub max_attempts: Option<u32>,

    /// Retry immediately instead of backing off exponentially
    #[arg(long)]
    pub no_backoff: bool,

    /// Maximum concurrent downloads (1-16) [default: 1]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: Option<u8>,

    /// Write a JSON run summary to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List harvested URLs without downloading anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["harvester"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.source.is_none());
        assert!(args.output.is_none());
        assert!(args.extensions.is_empty());
        assert!(args.pattern.is_none());
        assert!(args.max_attempts.is_none());
        assert!(!args.no_backoff);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["harvester", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["harvester", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["harvester", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["harvester", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_paths_and_repeated_extensions() {
        let args = Args::try_parse_from([
            "harvester",
            "--source",
            "exports",
            "-o",
            "media",
            "-e",
            "csv",
            "--extension",
            ".TXT",
        ])
        .unwrap();
        assert_eq!(args.source, Some(PathBuf::from("exports")));
        assert_eq!(args.output, Some(PathBuf::from("media")));
        assert_eq!(args.extensions, vec!["csv", ".TXT"]);
    }

    #[test]
    fn test_cli_pattern_parses_and_rejects_unknown() {
        let args = Args::try_parse_from(["harvester", "--pattern", "loose"]).unwrap();
        assert_eq!(args.pattern, Some(UrlPattern::Loose));

        let result = Args::try_parse_from(["harvester", "--pattern", "fuzzy"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_reference_mode_flags() {
        let args =
            Args::try_parse_from(["harvester", "--max-attempts", "0", "--no-backoff"]).unwrap();
        assert_eq!(args.max_attempts, Some(0));
        assert!(args.no_backoff);
    }

    #[test]
    fn test_cli_timeouts() {
        let args = Args::try_parse_from([
            "harvester",
            "--connect-timeout-ms",
            "250",
            "--request-timeout-ms",
            "5000",
            "--body-timeout-ms",
            "30000",
        ])
        .unwrap();
        assert_eq!(args.connect_timeout_ms, Some(250));
        assert_eq!(args.request_timeout_ms, Some(5000));
        assert_eq!(args.body_timeout_ms, Some(30000));
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let err = Args::try_parse_from(["harvester", "--body-timeout-ms", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["harvester", "-c", "16"]).unwrap();
        assert_eq!(args.concurrency, Some(16));

        let err = Args::try_parse_from(["harvester", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["harvester", "-c", "17"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_report_config_and_dry_run() {
        let args = Args::try_parse_from([
            "harvester",
            "--report",
            "run.json",
            "--config",
            "alt.toml",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.report, Some(PathBuf::from("run.json")));
        assert_eq!(args.config, Some(PathBuf::from("alt.toml")));
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["harvester", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
