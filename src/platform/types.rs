//! Platform-neutral chat and message references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chat addressed by numeric id or by public `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ChatRef {
    /// Numeric chat id (negative for groups and channels).
    Id(i64),
    /// Public username including the leading `@`.
    Username(String),
}

impl ChatRef {
    /// Parses an admin-supplied reference such as `-1001234`, `@channel` or `channel`.
    ///
    /// Returns `None` for empty input or usernames with whitespace.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(id) = trimmed.parse::<i64>() {
            return Some(Self::Id(id));
        }
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self::Username(format!("@{name}")))
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

/// A message that exists on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

impl MessageRef {
    #[must_use]
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self { chat_id, message_id }
    }
}

/// Upload call to use for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Document,
}

impl MediaKind {
    /// Bot API method name.
    #[must_use]
    pub fn api_method(self) -> &'static str {
        match self {
            Self::Video => "sendVideo",
            Self::Document => "sendDocument",
        }
    }

    /// Multipart field carrying the file.
    #[must_use]
    pub fn form_field(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

/// Metadata for one media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub caption: String,
    /// Bytes that will be read from the source.
    pub total_bytes: u64,
}

/// Membership of a user in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    #[serde(other)]
    Other,
}

impl MemberStatus {
    /// Creator, administrator and member count as joined.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// Chat metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_ref_parse() {
        assert_eq!(ChatRef::parse("-1001234567890"), Some(ChatRef::Id(-1_001_234_567_890)));
        assert_eq!(ChatRef::parse("@archive"), Some(ChatRef::Username("@archive".into())));
        assert_eq!(ChatRef::parse(" archive "), Some(ChatRef::Username("@archive".into())));
        assert_eq!(ChatRef::parse(""), None);
        assert_eq!(ChatRef::parse("@"), None);
        assert_eq!(ChatRef::parse("two words"), None);
    }

    #[test]
    fn test_chat_ref_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ChatRef::Id(-5)).unwrap(), "-5");
        assert_eq!(
            serde_json::to_string(&ChatRef::Username("@c".into())).unwrap(),
            r#""@c""#
        );
    }

    #[test]
    fn test_member_status_deserialize_and_joined() {
        let status: MemberStatus = serde_json::from_str(r#""administrator""#).unwrap();
        assert!(status.is_joined());
        let status: MemberStatus = serde_json::from_str(r#""left""#).unwrap();
        assert!(!status.is_joined());
        let status: MemberStatus = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(status, MemberStatus::Other);
    }
}
