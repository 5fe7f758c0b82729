//! Per-URL download coordination: one attempt, and the retry loop around it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::attempt::{Attempt, AttemptState};
use super::client::{BodyStream, FetchResponse, MediaFetcher};
use super::constants::{BODY_TIMEOUT_MS, CONNECT_TIMEOUT_MS, REQUEST_TIMEOUT_MS};
use super::error::{DownloadError, TimeoutPhase};
use super::filename::{basename_from_url, target_path};
use super::ledger::FailureLedger;
use super::retry::{RetryDecision, RetryPolicy, classify_error};

/// Timeouts applied to every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSettings {
    /// TCP/TLS connect timeout, enforced by the HTTP client.
    pub connect_timeout: Duration,
    /// Upper bound on the wait for response headers.
    pub request_timeout: Duration,
    /// Deadline for draining the body, measured from the start of streaming.
    pub body_timeout: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            body_timeout: Duration::from_millis(BODY_TIMEOUT_MS),
        }
    }
}

/// A file that was fully written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Final result of [`Downloader::download_with_retry`] for one URL.
#[derive(Debug)]
pub enum DownloadOutcome {
    Completed {
        file: DownloadedFile,
        attempts: u32,
    },
    /// The last error was permanent, or the attempt cap was reached.
    Failed {
        url: String,
        error: DownloadError,
        attempts: u32,
    },
    /// Cancellation was requested before the URL resolved.
    Cancelled { url: String, attempts: u32 },
}

impl DownloadOutcome {
    /// Number of attempts started for this URL.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}

/// Downloads attachment URLs into a single output directory.
///
/// Every failed attempt leaves its URL in the shared [`FailureLedger`] and no
/// file behind; every successful attempt leaves exactly one file and clears
/// the URL from the ledger.
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Arc<dyn MediaFetcher>,
    output_dir: PathBuf,
    settings: DownloadSettings,
    retry_policy: RetryPolicy,
    ledger: Arc<FailureLedger>,
}

impl Downloader {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        output_dir: impl Into<PathBuf>,
        settings: DownloadSettings,
        retry_policy: RetryPolicy,
        ledger: Arc<FailureLedger>,
    ) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            settings,
            retry_policy,
            ledger,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<FailureLedger> {
        &self.ledger
    }

    /// Performs a single attempt for `url`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if the URL does not parse or has no
    ///   usable file name. Nothing is fetched and the ledger is untouched.
    /// - [`DownloadError::Timeout`] if headers or the full body do not arrive
    ///   within their deadlines.
    /// - [`DownloadError::HttpStatus`] for a non-2xx response.
    /// - [`DownloadError::Transport`] for connection-level failures.
    /// - [`DownloadError::WriteFailure`] if the output file cannot be written.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download_once(&self, url: &str) -> Result<DownloadedFile, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let basename = basename_from_url(&parsed).ok_or_else(|| DownloadError::invalid_url(url))?;
        let mut attempt = Attempt::new(url, target_path(&self.output_dir, &basename));

        let response = match timeout(self.settings.request_timeout, self.fetcher.fetch(&parsed)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(attempt.fail(&self.ledger, e).await),
            Err(_) => {
                let e = DownloadError::timeout(url, TimeoutPhase::Response);
                return Err(attempt.fail(&self.ledger, e).await);
            }
        };

        if !(200..300).contains(&response.status) {
            let e = DownloadError::http_status(url, response.status);
            drop(response);
            return Err(attempt.fail(&self.ledger, e).await);
        }
        attempt.advance(AttemptState::HeadersReceived);

        // No await between the file appearing and the attempt owning it, or a
        // cancelled attempt could leave an untracked empty file.
        let file = match std::fs::File::create(attempt.path()) {
            Ok(file) => File::from_std(file),
            Err(e) => {
                let e = DownloadError::write_failure(attempt.path(), e);
                return Err(attempt.fail(&self.ledger, e).await);
            }
        };
        attempt.mark_file_created();

        self.stream_body(attempt, file, response).await
    }

    /// Drains `response` into `writer` under the body deadline and resolves
    /// the attempt.
    async fn stream_body<W>(
        &self,
        mut attempt: Attempt<'_>,
        writer: W,
        response: FetchResponse,
    ) -> Result<DownloadedFile, DownloadError>
    where
        W: AsyncWrite + Unpin,
    {
        attempt.advance(AttemptState::Streaming);
        let url = attempt.url();

        let expected = response.content_length;
        let streamed = timeout(
            self.settings.body_timeout,
            stream_to_file(writer, response.body, attempt.path()),
        )
        .await;

        let bytes = match streamed {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(attempt.fail(&self.ledger, e).await),
            Err(_) => {
                let e = DownloadError::timeout(url, TimeoutPhase::Body);
                return Err(attempt.fail(&self.ledger, e).await);
            }
        };

        if let Some(expected) = expected
            && bytes < expected
        {
            let e = DownloadError::transport(url, format!("body ended after {bytes} of {expected} bytes"));
            return Err(attempt.fail(&self.ledger, e).await);
        }

        let path = attempt.succeed(&self.ledger);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(filename = %filename, bytes, "downloaded");

        Ok(DownloadedFile {
            url: url.to_string(),
            path,
            bytes,
        })
    }

    /// Attempts `url` until it succeeds, fails permanently, exhausts the
    /// retry policy, or `cancel` fires.
    ///
    /// Cancellation is observed before each attempt, while an attempt is in
    /// flight, and during backoff sleeps. An attempt interrupted by
    /// cancellation removes its partial file.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn download_with_retry(&self, url: &str, cancel: &CancellationToken) -> DownloadOutcome {
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return cancelled(url, attempt);
            }
            attempt += 1;
            debug!(attempt, "attempting download");

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return cancelled(url, attempt),
                result = self.download_once(url) => result,
            };

            let error = match result {
                Ok(file) => return DownloadOutcome::Completed { file, attempts: attempt },
                Err(error) => error,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt = next_attempt,
                        max_attempts = ?self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying download"
                    );
                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::select! {
                            () = cancel.cancelled() => return cancelled(url, attempt),
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempts = attempt, error = %error, %reason, "giving up on download");
                    return DownloadOutcome::Failed {
                        url: url.to_string(),
                        error,
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

fn cancelled(url: &str, attempts: u32) -> DownloadOutcome {
    debug!(attempts, "download cancelled");
    DownloadOutcome::Cancelled {
        url: url.to_string(),
        attempts,
    }
}

/// Streams the body into `sink`, returning bytes written.
async fn stream_to_file<W>(sink: W, mut body: BodyStream, file_path: &Path) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(sink);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::write_failure(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::write_failure(file_path, e))?;

    Ok(bytes_written)
}
