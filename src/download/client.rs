//! HTTP layer behind the download coordinator.
//!
//! The coordinator only needs "send a GET, give me the status and a body
//! stream", so that surface is the [`MediaFetcher`] trait. [`HttpClient`] is
//! the reqwest-backed implementation used in production; tests substitute
//! scripted fetchers to drive failure paths a real server cannot produce on
//! demand (a body that stalls mid-stream, a reset after N bytes).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::error::{DownloadError, error_chain_message};
use crate::user_agent;

/// Response body as a stream of chunks; errors are already mapped to [`DownloadError`].
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Response headers have arrived; the body has not been read yet.
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    /// Remaining body.
    pub body: BodyStream,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests for the download coordinator.
#[async_trait]
pub trait MediaFetcher: Send + Sync + fmt::Debug {
    /// Sends a GET for `url` and resolves once response headers arrive.
    ///
    /// Dropping the returned body aborts the underlying connection.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, DownloadError>;
}

/// HTTP client for downloading attachments with streaming support.
///
/// Created once per run and shared across attempts, taking advantage of
/// connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given connect timeout.
    ///
    /// Only the connect phase is bounded here. The header wait and the body
    /// deadline are enforced by the coordinator so that they apply to every
    /// [`MediaFetcher`] implementation alike.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .gzip(true)
            .user_agent(user_agent::default_download_user_agent())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpClient {
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url.as_str(), &e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!(status, ?content_length, "response headers received");

        let request_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| DownloadError::transport(request_url.as_str(), error_chain_message(&e)))
            })
            .boxed();

        Ok(FetchResponse {
            status,
            content_length,
            body,
        })
    }
}
