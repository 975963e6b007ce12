//! Direct URL extraction from resolver payloads.
//!
//! Payloads are whatever the resolver API returned: a JSON tree or raw text.
//! Extraction is deterministic. Mappings are visited in the order the
//! resolver declared their fields (`serde_json` is built with
//! `preserve_order`), sequences in index order.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::link::GENERIC_URL_PATTERN;
use crate::resolver::ResolverPayload;

/// Top-level fields checked first, in precedence order.
pub const KNOWN_URL_FIELDS: [&str; 4] = ["download", "url", "link", "download_url"];

/// Longest raw-response excerpt shown to users, in characters.
pub const SNIPPET_MAX_CHARS: usize = 1000;

/// Recovers a direct download URL from a resolver payload.
///
/// 1. Text: first generic URL in the text.
/// 2. Object: the first known field holding a string that starts with `http`.
/// 3. Otherwise: depth-first search for the first string that starts with
///    `http` or contains a generic URL.
#[instrument(skip(payload))]
#[must_use]
pub fn extract_direct_url(payload: &ResolverPayload) -> Option<String> {
    let found = match payload {
        ResolverPayload::Text(text) => first_url_in(text),
        ResolverPayload::Json(value) => {
            let known = value.as_object().and_then(known_field);
            known.or_else(|| search(value))
        }
    };
    debug!(found = found.is_some(), "direct URL extraction finished");
    found
}

fn known_field(object: &Map<String, Value>) -> Option<String> {
    KNOWN_URL_FIELDS.iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| s.starts_with("http"))
            .map(str::to_string)
    })
}

fn search(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.starts_with("http") => Some(s.clone()),
        Value::String(s) => first_url_in(s),
        Value::Object(object) => object.values().find_map(search),
        Value::Array(items) => items.iter().find_map(search),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

fn first_url_in(text: &str) -> Option<String> {
    GENERIC_URL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Renders a payload excerpt of at most `max_chars` characters for diagnostics.
#[must_use]
pub fn snippet(payload: &ResolverPayload, max_chars: usize) -> String {
    let rendered = match payload {
        ResolverPayload::Text(text) => text.clone(),
        ResolverPayload::Json(value) => value.to_string(),
    };
    match rendered.char_indices().nth(max_chars) {
        Some((cut, _)) => rendered[..cut].to_string(),
        None => rendered,
    }
}
