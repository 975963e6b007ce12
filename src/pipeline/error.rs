//! Pipeline failures.
//!
//! The `Display` text of each variant is the status line shown to the user.

use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::download::TransferError;
use crate::platform::PlatformError;
use crate::resolver::ResolveError;
use crate::store::StoreError;

/// Terminal failure of one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The initial status message could not be sent; nothing else ran.
    #[error("could not send status message: {0}")]
    Status(#[source] PlatformError),

    #[error("Error contacting resolver API: {0}")]
    Resolve(#[from] ResolveError),

    /// No usable URL in the resolver payload.
    #[error("Could not parse direct URL. Raw response:\n\n{snippet}")]
    Extract { snippet: String },

    #[error("Download failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Upload failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Reading the archive setting failed.
    #[error("Settings unavailable: {0}")]
    Settings(#[from] StoreError),
}
