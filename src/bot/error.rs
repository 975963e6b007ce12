//! Error types for message handling.

use thiserror::Error;

use crate::platform::PlatformError;
use crate::store::StoreError;

/// Failure while handling one inbound message.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("platform call failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("store access failed: {0}")]
    Store(#[from] StoreError),
}
