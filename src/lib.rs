//! Harvester Core Library
//!
//! Finds media attachment links in exported chat logs and downloads them,
//! one attempt at a time, without ever leaving a partial file behind.
//!
//! # Architecture
//!
//! - [`files`] - source tree walking, line reading, output directory plumbing
//! - [`parser`] - attachment URL extraction
//! - [`download`] - per-URL coordinator, retry policy, failure ledger
//! - [`pipeline`] - walk, extract and download as one run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod files;
pub mod parser;
pub mod pipeline;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DownloadError, DownloadOutcome, DownloadSettings,
    Downloader, FailureLedger, FailureType, HttpClient, MediaFetcher, RetryDecision, RetryPolicy,
    classify_error,
};
pub use parser::{UrlPattern, extract, extract_from_file};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, RunSummary};
