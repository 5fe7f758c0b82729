//! Attachment download coordinator.
//!
//! Each URL gets one or more attempts. An attempt streams the response body
//! into `<uuid>_<basename>` in the output directory under three timers
//! (connect, response headers, body completion); any failure removes the
//! partial file and records the URL in the shared [`FailureLedger`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use harvester_core::download::{
//!     DownloadSettings, Downloader, FailureLedger, HttpClient, RetryPolicy,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = DownloadSettings::default();
//! let client = HttpClient::new(settings.connect_timeout)?;
//! let downloader = Downloader::new(
//!     Arc::new(client),
//!     "image-output",
//!     settings,
//!     RetryPolicy::default(),
//!     Arc::new(FailureLedger::new()),
//! );
//! let outcome = downloader
//!     .download_with_retry(
//!         "https://cdn.discordapp.com/attachments/1/2/cat.png",
//!         &CancellationToken::new(),
//!     )
//!     .await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod attempt;
mod client;
mod constants;
mod coordinator;
mod error;
mod filename;
mod ledger;
mod retry;

pub use attempt::{AttemptResolution, AttemptState};
pub use client::{BodyStream, FetchResponse, HttpClient, MediaFetcher};
pub use constants::{
    BODY_TIMEOUT_MS, CONNECT_TIMEOUT_MS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, REQUEST_TIMEOUT_MS,
};
pub use coordinator::{DownloadOutcome, DownloadSettings, DownloadedFile, Downloader};
pub use error::{DownloadError, ErrorKind, TimeoutPhase};
pub use ledger::FailureLedger;
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
