//! Walk, extract, download: one harvesting run end to end.

use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::{StreamExt, stream};
use serde::Serialize;
use thiserror::Error;
use tokio::task::{JoinError, spawn_blocking};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::download::{
    DEFAULT_CONCURRENCY, DownloadOutcome, DownloadSettings, Downloader, ErrorKind, FailureLedger,
    HttpClient, MAX_CONCURRENCY, MediaFetcher, RetryPolicy,
};
use crate::files::{SourceError, ensure_directory, list_files_recursively};
use crate::parser::{UrlPattern, extract_from_file};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    /// Allow-listed extensions, with or without the leading dot.
    pub extensions: Vec<String>,
    pub pattern: UrlPattern,
    pub settings: DownloadSettings,
    pub retry_policy: RetryPolicy,
    /// URLs in flight at once; `1` downloads strictly one after another.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("data"),
            output_dir: PathBuf::from("image-output"),
            extensions: vec!["csv".to_string()],
            pattern: UrlPattern::default(),
            settings: DownloadSettings::default(),
            retry_policy: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency { value: usize },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("source walk did not finish: {0}")]
    Walk(#[from] JoinError),
}

/// A URL that did not download.
#[derive(Debug, Clone, Serialize)]
pub struct FailedUrl {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// What a run did, suitable for a JSON report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// URLs extracted from the source tree, duplicates included.
    pub urls_found: usize,
    /// URLs for which at least one attempt started.
    pub attempted: usize,
    pub succeeded: usize,
    /// URLs that failed permanently or exhausted their attempts.
    pub failed: Vec<FailedUrl>,
    /// URLs rejected without any request (unparseable, no file name).
    pub skipped_invalid: usize,
    /// Attempts beyond the first, summed over all URLs.
    pub retries: u64,
    pub cancelled: bool,
    pub files: Vec<PathBuf>,
    /// Ledger contents at the end of the run.
    pub failure_ledger: Vec<String>,
}

impl RunSummary {
    /// URLs that were tried and did not produce a file.
    #[must_use]
    pub fn unsuccessful(&self) -> usize {
        self.failed.len() + self.skipped_invalid
    }

    fn record(&mut self, outcome: DownloadOutcome) {
        let attempts = outcome.attempts();
        if attempts > 0 {
            self.retries += u64::from(attempts - 1);
        }

        match outcome {
            DownloadOutcome::Completed { file, .. } => {
                self.attempted += 1;
                self.succeeded += 1;
                self.files.push(file.path);
            }
            DownloadOutcome::Failed { url, error, attempts } => {
                if error.kind() == ErrorKind::InvalidUrl {
                    self.skipped_invalid += 1;
                    return;
                }
                self.attempted += 1;
                self.failed.push(FailedUrl {
                    url,
                    kind: error.kind(),
                    message: error.to_string(),
                    attempts,
                });
            }
            DownloadOutcome::Cancelled { attempts, .. } => {
                self.cancelled = true;
                if attempts > 0 {
                    self.attempted += 1;
                }
            }
        }
    }
}

/// A configured harvesting run.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    downloader: Downloader,
}

impl Pipeline {
    /// Creates a pipeline that downloads through `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConcurrency`] if `config.concurrency`
    /// is outside 1..=16.
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn MediaFetcher>) -> Result<Self, PipelineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.concurrency) {
            return Err(PipelineError::InvalidConcurrency {
                value: config.concurrency,
            });
        }

        let downloader = Downloader::new(
            fetcher,
            config.output_dir.clone(),
            config.settings,
            config.retry_policy.clone(),
            Arc::new(FailureLedger::new()),
        );

        debug!(
            source = %config.source_root.display(),
            output = %config.output_dir.display(),
            pattern = %config.pattern,
            concurrency = config.concurrency,
            max_attempts = ?config.retry_policy.max_attempts(),
            backoff = config.retry_policy.backoff_enabled(),
            "creating pipeline"
        );

        Ok(Self { config, downloader })
    }

    /// Creates a pipeline backed by a real [`HttpClient`].
    ///
    /// # Errors
    ///
    /// Fails on invalid concurrency or if the HTTP client cannot be built.
    pub fn with_http_client(config: PipelineConfig) -> Result<Self, PipelineError> {
        let client = HttpClient::new(config.settings.connect_timeout)?;
        Self::new(config, Arc::new(client))
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<FailureLedger> {
        self.downloader.ledger()
    }

    /// Walks the source tree and extracts every attachment URL, in traversal
    /// order. Files are read concurrently; a file that cannot be read is
    /// logged and contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Source`] if the source root is missing, or
    /// [`PipelineError::Walk`] if the directory walk panics.
    #[instrument(skip(self), fields(source = %self.config.source_root.display()))]
    pub async fn harvest_urls(&self) -> Result<Vec<String>, PipelineError> {
        let root = self.config.source_root.clone();
        let extensions = self.config.extensions.clone();
        let files = spawn_blocking(move || list_files_recursively(&root, &extensions)).await??;
        info!(files = files.len(), "scanning candidate files");

        let pattern = self.config.pattern;
        let per_file = join_all(files.iter().map(|path| extract_from_file(path, pattern))).await;

        let mut urls = Vec::new();
        for (path, result) in files.iter().zip(per_file) {
            match result {
                Ok(found) => urls.extend(found),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }

        info!(urls = urls.len(), "harvested attachment URLs");
        Ok(urls)
    }

    /// Downloads `urls` in order, at most `concurrency` at a time.
    ///
    /// Outcomes are recorded in input order. Once `cancel` fires, no new
    /// attempts start and the summary is marked cancelled.
    #[instrument(skip(self, urls, cancel), fields(count = urls.len()))]
    pub async fn download_all(&self, urls: &[String], cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary {
            urls_found: urls.len(),
            ..RunSummary::default()
        };
        let total = urls.len();

        let mut outcomes = pin!(
            stream::iter(urls.iter().enumerate())
                .map(|(index, url)| async move {
                    debug!(position = index + 1, total, url = %url, "starting download");
                    self.downloader.download_with_retry(url, cancel).await
                })
                .buffered(self.config.concurrency)
        );

        while let Some(outcome) = outcomes.next().await {
            summary.record(outcome);
        }

        summary.cancelled |= cancel.is_cancelled();
        summary.failure_ledger = self.ledger().snapshot();

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            skipped_invalid = summary.skipped_invalid,
            retries = summary.retries,
            cancelled = summary.cancelled,
            "download run complete"
        );
        summary
    }

    /// Runs the whole pipeline: harvest, prepare the output directory, download.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Source`] if the source root is missing or the
    /// output directory cannot be created. Individual download failures are
    /// reported in the summary, not as errors.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, PipelineError> {
        let urls = self.harvest_urls().await?;
        ensure_directory(&self.config.output_dir).await?;
        Ok(self.download_all(&urls, cancel).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::DownloadError;

    const URL: &str = "https://cdn.discordapp.com/attachments/1/2/a.png";

    #[test]
    fn test_pipeline_rejects_out_of_range_concurrency() {
        for value in [0, MAX_CONCURRENCY + 1] {
            let config = PipelineConfig {
                concurrency: value,
                ..PipelineConfig::default()
            };
            let result = Pipeline::with_http_client(config);
            assert!(matches!(
                result,
                Err(PipelineError::InvalidConcurrency { value: v }) if v == value
            ));
        }
    }

    #[test]
    fn test_default_config_matches_reference_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_root, PathBuf::from("data"));
        assert_eq!(config.output_dir, PathBuf::from("image-output"));
        assert_eq!(config.extensions, vec!["csv"]);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_summary_counts_retries_and_invalid_separately() {
        let mut summary = RunSummary::default();
        summary.record(DownloadOutcome::Failed {
            url: "nope".to_string(),
            error: DownloadError::invalid_url("nope"),
            attempts: 1,
        });
        summary.record(DownloadOutcome::Failed {
            url: URL.to_string(),
            error: DownloadError::http_status(URL, 404),
            attempts: 3,
        });
        summary.record(DownloadOutcome::Cancelled {
            url: URL.to_string(),
            attempts: 0,
        });

        assert_eq!(summary.skipped_invalid, 1);
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].kind, ErrorKind::HttpStatus);
        assert_eq!(summary.retries, 2);
        assert!(summary.cancelled);
        assert_eq!(summary.unsuccessful(), 2);
    }

    #[test]
    fn test_summary_serializes_error_kind_as_snake_case() {
        let mut summary = RunSummary::default();
        summary.record(DownloadOutcome::Failed {
            url: URL.to_string(),
            error: DownloadError::http_status(URL, 500),
            attempts: 5,
        });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed"][0]["kind"], "http_status");
        assert_eq!(json["retries"], 4);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_harvest_walks_on_blocking_pool_and_keeps_walk_order() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("data");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/b.csv"), format!("{URL}\n")).unwrap();
        std::fs::write(root.join("a.csv"), "https://cdn.discordapp.com/attachments/9/9/z.gif\n").unwrap();
        let config = PipelineConfig {
            source_root: root.clone(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::with_http_client(config).unwrap();

        let urls = pipeline.harvest_urls().await.unwrap();
        assert_eq!(
            urls,
            vec!["https://cdn.discordapp.com/attachments/9/9/z.gif".to_string(), URL.to_string()]
        );

        std::fs::remove_dir_all(&root).unwrap();
        let result = pipeline.harvest_urls().await;
        assert!(matches!(
            result,
            Err(PipelineError::Source(SourceError::MissingRoot { .. }))
        ));
    }
}
