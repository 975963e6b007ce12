//! Error types for delivery.

use thiserror::Error;

use crate::platform::{ChatRef, PlatformError};

/// Errors that abort a delivery. The buffer is released in every case.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The single upload of the chosen mode failed.
    #[error("upload to {destination} failed: {source}")]
    UploadFailed {
        destination: ChatRef,
        #[source]
        source: PlatformError,
    },

    /// The copy to the requester failed and so did the direct re-upload.
    #[error("copy failed ({copy_error}) and direct upload failed: {source}")]
    FallbackFailed {
        copy_error: PlatformError,
        #[source]
        source: PlatformError,
    },

    /// The buffer could not be positioned at byte 0.
    #[error("failed to rewind buffered file: {source}")]
    Rewind {
        #[source]
        source: std::io::Error,
    },
}
