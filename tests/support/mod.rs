//! Shared helpers for integration tests.
//!
//! Harvested URLs always point at the attachment CDN, so tests route them to
//! a local wiremock server with [`RoutingFetcher`], which keeps the path and
//! query and swaps the origin.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use harvester_core::download::{DownloadError, FetchResponse, HttpClient, MediaFetcher};
use url::Url;
use wiremock::{Respond, ResponseTemplate};

/// Sends every request to `base` instead of the URL's own origin.
#[derive(Debug)]
pub struct RoutingFetcher {
    inner: HttpClient,
    base: Url,
}

impl RoutingFetcher {
    pub fn new(base: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: HttpClient::new(Duration::from_secs(1)).expect("build HTTP client"),
            base: Url::parse(base).expect("mock server URI is a valid URL"),
        })
    }
}

#[async_trait]
impl MediaFetcher for RoutingFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, DownloadError> {
        let mut routed = self.base.clone();
        routed.set_path(url.path());
        routed.set_query(url.query());
        self.inner.fetch(&routed).await
    }
}

/// Responder that fails the first `fail_count` requests with 503, then returns 200 with body.
pub struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    success_body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, success_body: &[u8]) -> (Self, Arc<AtomicUsize>) {
        let request_count = Arc::new(AtomicUsize::new(0));
        let responder = Self {
            request_count: Arc::clone(&request_count),
            fail_count,
            success_body: success_body.to_vec(),
        };
        (responder, request_count)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(503).set_body_bytes(b"service unavailable")
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.success_body.clone())
        }
    }
}

/// Attachment URL on the real CDN host for `path` (no leading slash).
pub fn cdn_url(path: &str) -> String {
    format!("https://cdn.discordapp.com/attachments/{path}")
}

/// Writes `files` (relative path, contents) under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
    }
}

/// Sorted list of entries directly inside `dir`.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").path())
        .collect();
    entries.sort();
    entries
}

/// `<uuid>_<basename>` check for a written file.
pub fn assert_unique_name(path: &Path, basename: &str) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("utf-8 file name");
    let (prefix, rest) = name.split_at(36);
    assert!(
        uuid::Uuid::parse_str(prefix).is_ok(),
        "expected uuid prefix in {name}"
    );
    assert_eq!(rest, format!("_{basename}"), "unexpected name {name}");
}
