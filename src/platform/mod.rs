//! Messaging platform seam.
//!
//! The pipeline and the bot talk to the chat platform only through
//! [`MessagingPlatform`]. [`TelegramClient`] implements it over the Telegram
//! Bot HTTP API; tests use an in-crate recording fake.

mod error;
pub mod telegram;
mod types;

pub use error::PlatformError;
pub use telegram::{TelegramClient, TelegramMessage, TelegramUser, Update};
pub use types::{ChatInfo, ChatRef, MediaKind, MediaUpload, MemberStatus, MessageRef};

use async_trait::async_trait;

use crate::download::{ProgressSink, SpooledBuffer};

/// Capabilities the relay needs from a chat platform.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Sends a text message, optionally as a reply to `reply_to` in the same chat.
    async fn send_text(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<MessageRef, PlatformError>;

    /// Replaces the text of an existing message.
    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), PlatformError>;

    /// Uploads `source` from its current position to the end.
    ///
    /// Upload progress is reported to `progress` as bytes leave the source.
    async fn send_media(
        &self,
        chat: &ChatRef,
        upload: &MediaUpload,
        source: &mut SpooledBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<MessageRef, PlatformError>;

    /// Copies `message` into `to` without re-uploading; returns the new message id.
    async fn copy_message(&self, to: &ChatRef, message: &MessageRef) -> Result<i64, PlatformError>;

    /// Membership of `user_id` in `chat`.
    async fn member_status(&self, chat: &ChatRef, user_id: i64) -> Result<MemberStatus, PlatformError>;

    /// Metadata of `chat`; fails when the chat is unknown or inaccessible.
    async fn chat_info(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError>;
}
