//! User-Agent string sent with attachment requests.

/// Product token and comment identifying the tool to the CDN.
const PRODUCT_COMMENT: &str = "attachment-archiver";

/// Default User-Agent for download requests (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} ({PRODUCT_COMMENT})")
}
