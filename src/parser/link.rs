//! Share-link detection in free text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Any http(s) URL, up to the next whitespace.
#[allow(clippy::expect_used)]
pub(crate) static GENERIC_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s]+").expect("URL regex is valid") // Static pattern, safe to panic
});

/// A URL whose text mentions a Terabox host or one of its mirror domains.
#[allow(clippy::expect_used)]
static SHARE_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?://[^\s]*(terabox|1024tera|4funbox|mirrobox|nephobox|freeterabox)[^\s]*",
    )
    .expect("share link regex is valid") // Static pattern, safe to panic
});

/// Returns true if `text` contains a share link.
#[must_use]
pub fn contains_share_link(text: &str) -> bool {
    SHARE_LINK_PATTERN.is_match(text)
}

/// Returns the link to resolve for a message, if the message carries a share link.
///
/// Detection uses the share-link pattern; the returned value is the first
/// generic URL in the text, so a message with an unrelated URL before the share
/// link resolves that first URL. Messages with no generic URL match fall back
/// to the trimmed text.
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn find_share_link(text: &str) -> Option<String> {
    if !contains_share_link(text) {
        return None;
    }
    let link = GENERIC_URL_PATTERN
        .find(text)
        .map_or_else(|| text.trim(), |m| m.as_str());
    trace!(link = %link, "share link detected");
    Some(link.to_string())
}
