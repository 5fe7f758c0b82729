//! Error types for the download module.
//!
//! Every failed attempt resolves to exactly one [`DownloadError`]. The
//! variants line up with the retry classification in [`super::retry`]:
//! malformed targets are permanent, everything network- or disk-shaped is
//! retried.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Which timer fired when an attempt timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// TCP/TLS connection could not be established in time.
    Connect,
    /// Connection was open but no response headers arrived in time.
    Response,
    /// Headers arrived but the body did not finish draining before the deadline.
    Body,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Response => "response",
            Self::Body => "body",
        })
    }
}

/// Coarse error kind, used in run reports and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    Transport,
    Timeout,
    HttpStatus,
    WriteFailure,
}

/// Errors that can occur during a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL could not be parsed, or has no path segment to name the file after.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// Connection-level failure (DNS, refused, reset, TLS) before or after headers.
    #[error("transport error downloading {url}: {message}")]
    Transport {
        /// The URL being downloaded.
        url: String,
        /// Flattened message of the underlying error chain.
        message: String,
    },

    /// One of the attempt timers elapsed.
    #[error("{phase} timeout downloading {url}")]
    Timeout {
        /// The URL being downloaded.
        url: String,
        /// The timer that fired.
        phase: TimeoutPhase,
    },

    /// Server answered with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL being downloaded.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Creating or writing the output file failed.
    #[error("write failure on {path}: {source}")]
    WriteFailure {
        /// The output path being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a transport error from any displayable cause.
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates a timeout error for the given phase.
    pub fn timeout(url: impl Into<String>, phase: TimeoutPhase) -> Self {
        Self::Timeout {
            url: url.into(),
            phase,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a write failure error.
    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Maps a reqwest error raised while sending the request.
    ///
    /// reqwest reports an elapsed `connect_timeout` as a timeout error; every
    /// other failure is a transport error carrying the full cause chain.
    pub fn from_reqwest(url: impl Into<String>, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url, TimeoutPhase::Connect)
        } else {
            Self::transport(url, error_chain_message(error))
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::WriteFailure { .. } => ErrorKind::WriteFailure,
        }
    }
}

/// Joins an error and all of its sources into a single line.
///
/// reqwest's top-level message is usually just "error sending request";
/// the useful part (DNS failure, connection refused) sits further down.
pub(crate) fn error_chain_message(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
