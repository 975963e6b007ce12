//! Error types for resolver calls.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while calling the resolver API.
///
/// Non-success HTTP statuses are not errors: the body is still returned and
/// the extractor decides whether it is usable.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The stored template could not be read.
    #[error("failed to read resolver template: {0}")]
    Settings(#[from] StoreError),

    /// The templated URL is not a valid URL.
    #[error("invalid resolver URL: {url}")]
    InvalidUrl {
        /// The rendered request URL.
        url: String,
    },

    /// Connection or protocol failure talking to the resolver.
    #[error("network error calling resolver: {source}")]
    Transport {
        /// The rendered request URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The resolver did not answer within the configured timeout.
    #[error("resolver timed out")]
    Timeout {
        /// The rendered request URL.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("{message}")]
    ClientBuild {
        /// Description of the construction failure.
        message: String,
    },
}

impl ResolveError {
    /// Maps a reqwest error to `Timeout` or `Transport`.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Transport {
                url: url.into(),
                source,
            }
        }
    }

    pub(crate) fn client_build(error: crate::http_client::BuildClientError) -> Self {
        Self::ClientBuild {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreDbErrorKind;

    #[test]
    fn test_timeout_display() {
        let error = ResolveError::Timeout {
            url: "https://resolver/?link=x".to_string(),
        };
        assert_eq!(error.to_string(), "resolver timed out");
    }

    #[test]
    fn test_settings_error_converts() {
        let store_error = StoreError::Database {
            key: "api_template".to_string(),
            kind: StoreDbErrorKind::BusyOrLocked,
            message: "database is locked".to_string(),
        };
        let error: ResolveError = store_error.into();
        assert!(error.to_string().contains("resolver template"));
    }
}
