//! State and resources of a single download attempt.
//!
//! ```text
//! Connecting ──► HeadersReceived ──► Streaming ──► Resolved(Success)
//!     │                 │                │
//!     └─────────────────┴────────────────┴───────► Resolved(Failure(kind))
//! ```
//!
//! An [`Attempt`] owns the target path for its whole life. Whatever way it
//! resolves, the partial file is gone by the time control returns to the
//! caller: explicitly in [`Attempt::fail`], or in `Drop` when the attempt
//! future is cancelled mid-flight.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::error::{DownloadError, ErrorKind};
use super::ledger::FailureLedger;
use crate::files::delete_file;

/// Terminal result of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResolution {
    Success,
    Failure(ErrorKind),
}

/// Phase of an in-flight attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Request sent, waiting for the connection and response headers.
    Connecting,
    /// Headers accepted, output file being opened.
    HeadersReceived,
    /// Body is being piped into the output file under the completion deadline.
    Streaming,
    /// Attempt finished; no resources remain.
    Resolved(AttemptResolution),
}

impl AttemptState {
    /// Returns whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use AttemptResolution::{Failure, Success};
        use AttemptState::{Connecting, HeadersReceived, Resolved, Streaming};

        matches!(
            (self, next),
            (Connecting, HeadersReceived)
                | (HeadersReceived, Streaming)
                | (Streaming, Resolved(Success))
                | (
                    Connecting | HeadersReceived | Streaming,
                    Resolved(Failure(_))
                )
        )
    }

    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[derive(Debug)]
pub(crate) struct Attempt<'a> {
    url: &'a str,
    path: PathBuf,
    state: AttemptState,
    file_created: bool,
}

impl<'a> Attempt<'a> {
    pub(crate) fn new(url: &'a str, path: PathBuf) -> Self {
        Self {
            url,
            path,
            state: AttemptState::Connecting,
            file_created: false,
        }
    }

    pub(crate) fn url(&self) -> &'a str {
        self.url
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> AttemptState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: AttemptState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal attempt transition {:?} -> {next:?}",
            self.state
        );
        trace!(url = self.url, from = ?self.state, to = ?next, "attempt state");
        self.state = next;
    }

    /// Marks the output file as existing on disk, so failure paths remove it.
    pub(crate) fn mark_file_created(&mut self) {
        self.file_created = true;
    }

    /// Resolves the attempt as failed: records the URL in the ledger and
    /// deletes any partial output before handing the error back.
    ///
    /// The caller must have dropped the response stream and file handle first.
    pub(crate) async fn fail(mut self, ledger: &FailureLedger, error: DownloadError) -> DownloadError {
        self.advance(AttemptState::Resolved(AttemptResolution::Failure(
            error.kind(),
        )));
        ledger.add(self.url);

        if self.file_created {
            match delete_file(&self.path).await {
                Ok(()) => debug!(path = %self.path.display(), "removed partial file"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial file"),
            }
            self.file_created = false;
        }

        error
    }

    /// Resolves the attempt as successful and returns the finished file's path.
    pub(crate) fn succeed(mut self, ledger: &FailureLedger) -> PathBuf {
        self.advance(AttemptState::Resolved(AttemptResolution::Success));
        if ledger.remove(self.url) {
            debug!(url = self.url, "cleared earlier failure");
        }
        self.file_created = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        // Only reachable when the attempt future was dropped before resolving.
        if self.file_created && !self.state.is_resolved() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed partial file of abandoned attempt"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial file"),
            }
        }
    }
}
