//! Filename hint derivation for transferred files.
//!
//! The hint is what the messaging platform shows as the document name, so it
//! is sanitized for separators and control characters but otherwise kept as
//! the server sent it.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use tracing::debug;
use url::Url;

/// `filename=` / `filename*=` value, optionally RFC 5987 `UTF-8''` prefixed and quoted.
#[allow(clippy::expect_used)]
static CONTENT_DISPOSITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?=(UTF-8'')?"?([^";]+)"?"#)
        .expect("content-disposition regex is valid") // Static pattern, safe to panic
});

/// Derives the filename hint for a response.
///
/// Order: Content-Disposition header, last path segment of the final URL,
/// then a generated `file_<uuid>` placeholder.
pub(crate) fn filename_hint(headers: &HeaderMap, final_url: &Url) -> String {
    if let Some(header) = headers.get(CONTENT_DISPOSITION)
        && let Ok(value) = header.to_str()
        && let Some(name) = parse_content_disposition(value)
    {
        return sanitize_filename(&name);
    }

    filename_from_url(final_url).unwrap_or_else(placeholder_filename)
}

/// Parses the filename out of a Content-Disposition header value.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987, percent-decoded)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    let captures = CONTENT_DISPOSITION_PATTERN.captures(header)?;
    let raw = captures.get(2)?.as_str().trim();
    if raw.is_empty() {
        return None;
    }

    if captures.get(1).is_some() {
        return match urlencoding::decode(raw) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(e) => {
                debug!(value = %raw, error = %e, "RFC 5987 decode failed, using raw value");
                Some(raw.to_string())
            }
        };
    }

    Some(raw.to_string())
}

/// Last non-empty path segment of `url`, percent-decoded and sanitized.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).unwrap_or_else(|e| {
        debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
        last.into()
    });
    Some(sanitize_filename(&decoded))
}

/// Unique name used when nothing better is available.
pub(crate) fn placeholder_filename() -> String {
    format!("file_{}", uuid::Uuid::new_v4().simple())
}

/// Sanitizes a filename for display and filesystem safety.
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

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Lowercased extension including the dot, e.g. `.mp4`.
///
/// Leading dots belong to the stem: `.mp4` is a hidden file with no extension.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    let dot = stem_start + name[stem_start..].rfind('.')?;
    let ext = &name[dot..];
    (ext.len() > 1).then(|| ext.to_ascii_lowercase())
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
