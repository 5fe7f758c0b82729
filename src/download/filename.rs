//! Output filename derivation for downloaded attachments.
//!
//! Each attempt writes to `<unique-id>_<basename>`, where the basename is the
//! last path segment of the source URL. The prefix keeps two attachments that
//! share a basename (`image.png` is common) from overwriting each other.

use std::path::{Component, Path, PathBuf};

use url::Url;
use uuid::Uuid;

/// Returns the decoded, filesystem-safe last path segment of `url`.
///
/// Returns `None` when the path ends in `/` or the segment sanitizes to nothing.
pub(crate) fn basename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(last)
        .map_or_else(|_| last.to_string(), std::borrow::Cow::into_owned);
    let sanitized = sanitize_filename(&decoded);
    (!sanitized.trim_matches('_').is_empty()).then_some(sanitized)
}

/// Builds `<unique-id>_<basename>` with a fresh v4 UUID.
pub(crate) fn unique_filename(basename: &str) -> String {
    format!("{}_{basename}", Uuid::new_v4())
}

/// Resolves the full output path for a new attempt.
pub(crate) fn target_path(output_dir: &Path, basename: &str) -> PathBuf {
    output_dir.join(unique_filename(basename))
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
