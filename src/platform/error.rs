//! Error types for messaging platform calls.

use thiserror::Error;

/// Errors returned by [`MessagingPlatform`](super::MessagingPlatform) implementations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The request never produced a response.
    #[error("network error calling {method}: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The platform rejected the call.
    #[error("{method} failed ({code}): {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected {method} response: {message}")]
    Decode {
        method: &'static str,
        message: String,
    },

    /// Reading the upload source failed.
    #[error("reading upload source for {method}: {source}")]
    Source {
        method: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("{message}")]
    ClientBuild { message: String },
}

impl PlatformError {
    /// Request URLs embed the bot token, so they are stripped from the error.
    pub(crate) fn transport(method: &'static str, source: reqwest::Error) -> Self {
        Self::Transport {
            method,
            source: source.without_url(),
        }
    }

    pub(crate) fn decode(method: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            method,
            message: message.into(),
        }
    }

    /// Returns true for the "message is not modified" edit rejection.
    #[must_use]
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let error = PlatformError::Api {
            method: "copyMessage",
            code: 400,
            description: "Bad Request: message to copy not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "copyMessage failed (400): Bad Request: message to copy not found"
        );
        assert!(!error.is_not_modified());
    }

    #[test]
    fn test_is_not_modified() {
        let error = PlatformError::Api {
            method: "editMessageText",
            code: 400,
            description: "Bad Request: message is not modified".to_string(),
        };
        assert!(error.is_not_modified());
    }
}
