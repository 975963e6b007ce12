//! Error types for the transfer engine.
//!
//! Each variant carries enough context to render a user-facing status line
//! without consulting logs.

use thiserror::Error;

/// Errors that can occur while streaming a resource into a spooled buffer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The direct URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server answered with a non-success status; no body was read.
    #[error("download failed, status: {status}")]
    DownloadFailed {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The declared or observed size exceeds the configured limit.
    #[error("file too large: {actual} bytes (limit {limit})")]
    TooLarge {
        /// Configured maximum in bytes.
        limit: u64,
        /// Advertised length, or bytes received when the limit tripped.
        actual: u64,
    },

    /// Network-level failure before or during streaming.
    #[error("network error downloading {url}: {source}")]
    Transport {
        /// The URL being downloaded.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The per-transfer timeout elapsed.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("{message}")]
    ClientBuild {
        /// Description of the construction failure.
        message: String,
    },

    /// Writing to or rewinding the spooled buffer failed.
    #[error("spool IO error: {source}")]
    Spool {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Creates a non-success status error.
    pub fn download_failed(url: impl Into<String>, status: u16) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            status,
        }
    }

    /// Creates a size limit error.
    #[must_use]
    pub fn too_large(limit: u64, actual: u64) -> Self {
        Self::TooLarge { limit, actual }
    }

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

    /// Creates a spool IO error.
    #[must_use]
    pub fn spool(source: std::io::Error) -> Self {
        Self::Spool { source }
    }

    pub(crate) fn client_build(error: crate::http_client::BuildClientError) -> Self {
        Self::ClientBuild {
            message: error.to_string(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
