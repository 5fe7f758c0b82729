//! Attachment URL extraction from exported chat logs.
//!
//! Lines are matched independently. Every match is kept, in order, including
//! duplicates: the same attachment posted twice is downloaded twice.
//!
//! # Example
//!
//! ```
//! use harvester_core::parser::{UrlPattern, extract};
//!
//! let lines = [
//!     "id,author,content",
//!     "1,alice,look https://cdn.discordapp.com/attachments/1/2/cat.png",
//! ];
//! let urls = extract(lines, UrlPattern::Strict);
//! assert_eq!(urls, vec!["https://cdn.discordapp.com/attachments/1/2/cat.png"]);
//! ```

mod attachment;

use std::path::Path;

use tracing::{debug, instrument};

pub use attachment::UrlPattern;

use crate::files::{SourceError, read_lines};

/// Extracts attachment URLs from `lines`, left to right, line by line.
///
/// Empty lines are skipped.
#[must_use]
pub fn extract<I, S>(lines: I, pattern: UrlPattern) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut urls = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if !line.is_empty() {
            attachment::collect_line_matches(line, pattern, &mut urls);
        }
    }
    urls
}

/// Reads `path` line by line and extracts attachment URLs from it.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be opened or read.
#[instrument(skip(pattern), fields(path = %path.display()))]
pub async fn extract_from_file(path: &Path, pattern: UrlPattern) -> Result<Vec<String>, SourceError> {
    let mut reader = read_lines(path).await?;
    let mut urls = Vec::new();
    let mut line_count = 0usize;

    while let Some(line) = reader.next_line().await? {
        line_count += 1;
        if !line.is_empty() {
            attachment::collect_line_matches(&line, pattern, &mut urls);
        }
    }

    debug!(lines = line_count, urls = urls.len(), "extracted attachment URLs");
    Ok(urls)
}
