//! Retry policy for failed download attempts.
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - may succeed on a later attempt (timeouts,
//!   transport errors, 5xx, local write failures)
//! - [`FailureType::Permanent`] - will fail the same way every time
//!   (malformed URL, most 4xx)
//!
//! The [`RetryPolicy`] then decides whether to try again and how long to
//! wait. A policy may be unlimited (retry transient errors forever) and may
//! have backoff disabled (retry immediately).
//!
//! # Example
//!
//! ```
//! use harvester_core::download::{
//!     DownloadError, RetryPolicy, FailureType, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/file.png", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;

/// Default maximum attempts per URL (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Failure that won't succeed regardless of retries.
    Permanent,
}

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the download after the specified delay.
    Retry {
        /// How long to wait before retrying (zero when backoff is disabled).
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the download.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
///
/// With backoff disabled the delay is always zero.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt); `None` is unlimited.
    max_attempts: Option<u32>,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f32,

    /// Whether to wait between attempts at all.
    backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// `max_attempts` of `None` retries transient failures forever.
    #[must_use]
    pub fn new(
        max_attempts: Option<u32>,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.map(|n| n.max(1)),
            base_delay,
            max_delay,
            backoff_multiplier,
            backoff: true,
        }
    }

    /// Creates a policy with a custom attempt cap; `0` means unlimited.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: (max_attempts > 0).then_some(max_attempts),
            ..Self::default()
        }
    }

    /// Retries transient failures forever, with no delay between attempts.
    #[must_use]
    pub fn unlimited_immediate() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
        .without_backoff()
    }

    /// Disables the delay between attempts.
    #[must_use]
    pub fn without_backoff(mut self) -> Self {
        self.backoff = false;
        self
    }

    /// Returns the attempt cap, or `None` when unlimited.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns whether delays are applied between attempts.
    #[must_use]
    pub fn backoff_enabled(&self) -> bool {
        self.backoff
    }

    /// Determines whether to retry a failed download.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = ?self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if let Some(max) = self.max_attempts
            && attempt >= max
        {
            debug!(attempt, max, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({max}) exhausted"),
            };
        }

        let delay = if self.backoff {
            self.calculate_delay(attempt)
        } else {
            Duration::ZERO
        };

        debug!(
            attempt,
            next_attempt = attempt.saturating_add(1),
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt.saturating_add(1),
        }
    }

    /// Calculates the delay for a retry attempt with exponential backoff and jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt 1 = base * multiplier^0
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    /// Generates random jitter between 0 and `MAX_JITTER`.
    fn calculate_jitter(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a download error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | InvalidUrl | Permanent |
/// | Transport | Transient |
/// | Timeout (any phase) | Transient |
/// | WriteFailure | Transient |
/// | HTTP 408, 429, 5xx | Transient |
/// | other HTTP 4xx | Permanent |
#[instrument(level = "trace")]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::InvalidUrl { .. } => FailureType::Permanent,
        DownloadError::Transport { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::WriteFailure { .. } => FailureType::Transient,
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
    }
}

/// Classifies an HTTP status code into a failure type.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient, // Request Timeout
        429 => FailureType::Transient, // Too Many Requests
        400..=499 => FailureType::Permanent,
        500..=599 => FailureType::Transient,
        // 1xx/3xx that reached us unfollowed are not going to change
        _ => FailureType::Permanent,
    }
}
