//! Attachment URL matching.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Image attachments only; greedy, so the match runs to the last image
/// extension before whitespace.
#[allow(clippy::expect_used)]
static STRICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://cdn\.discordapp\.com/attachments/[^\s]+\.(png|gif|jpg|jpeg|bmp)")
        .expect("strict attachment regex is valid") // Static pattern, safe to panic
});

/// Any attachment, up to the next whitespace.
#[allow(clippy::expect_used)]
static LOOSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://cdn\.discordapp\.com/attachments/\S+")
        .expect("loose attachment regex is valid") // Static pattern, safe to panic
});

/// Which attachment links to harvest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UrlPattern {
    /// Links ending in an image extension (png, gif, jpg, jpeg, bmp).
    #[default]
    Strict,
    /// Every attachment link regardless of extension.
    ///
    /// The match runs to the next whitespace, so a quoted CSV cell keeps its
    /// closing quote and delimiter (`.../a.png",`). Such links usually 404
    /// and end up in the failure ledger.
    Loose,
}

impl UrlPattern {
    pub(crate) fn regex(self) -> &'static Regex {
        match self {
            Self::Strict => &STRICT_PATTERN,
            Self::Loose => &LOOSE_PATTERN,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Loose => "loose",
        })
    }
}

impl FromStr for UrlPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "loose" => Ok(Self::Loose),
            other => Err(format!("unknown URL pattern '{other}' (expected strict or loose)")),
        }
    }
}

/// Appends every match in `line` to `out`, left to right.
pub(crate) fn collect_line_matches(line: &str, pattern: UrlPattern, out: &mut Vec<String>) {
    for found in pattern.regex().find_iter(line) {
        trace!(url = found.as_str(), "matched attachment URL");
        out.push(found.as_str().to_string());
    }
}
