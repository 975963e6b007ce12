//! Chat-facing bot: commands, access gates and the share-link trigger.
//!
//! [`Bot::handle_message`] decides what one inbound text message means.
//! [`run_polling`] feeds it from Telegram long polling, one task per message.

mod access;
mod command;
mod error;
mod polling;

pub use access::{AccessDenied, AdminList, ensure_joined};
pub use command::{Command, parse_command};
pub use error::BotError;
pub use polling::{POLL_TIMEOUT_SECS, run_polling};

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::delivery::Requester;
use crate::parser::find_share_link;
use crate::pipeline::{IncomingLink, Pipeline};
use crate::platform::{ChatRef, MessagingPlatform, TelegramMessage};
use crate::resolver::LINK_PLACEHOLDER;
use crate::store::{CounterKey, CounterStore, SettingKey, SettingsStore};

pub const START_TEXT: &str = "Hi! Send me a Terabox share link and I'll resolve, download and send the file. \
Files will also be stored to your dumb channel if configured.\n\nUse /help to see commands.";
pub const HELP_TEXT: &str = "Send a terabox link. Admin commands: /set_force_sub, /remove_force_sub, \
/set_dumb_channel, /remove_dumb_channel, /set_api_template, /stats";
pub const NOT_AUTHORIZED_TEXT: &str = "You're not authorized to use this command.";

/// Text message as seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub text: String,
}

impl InboundMessage {
    /// Converts a Telegram message; `None` for messages without text or from bots.
    #[must_use]
    pub fn from_telegram(message: &TelegramMessage) -> Option<Self> {
        let text = message.text.clone()?;
        if message.from.as_ref().is_some_and(|user| user.is_bot) {
            return None;
        }
        Some(Self {
            chat_id: message.chat.id,
            message_id: message.message_id,
            user_id: message.from.as_ref().map(|user| user.id),
            username: message.from.as_ref().and_then(|user| user.username.clone()),
            text,
        })
    }
}

/// Message router.
pub struct Bot {
    platform: Arc<dyn MessagingPlatform>,
    settings: Arc<dyn SettingsStore>,
    counters: Arc<dyn CounterStore>,
    pipeline: Pipeline,
    admins: AdminList,
    username: Option<String>,
}

impl Bot {
    #[must_use]
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        settings: Arc<dyn SettingsStore>,
        counters: Arc<dyn CounterStore>,
        pipeline: Pipeline,
        admins: AdminList,
    ) -> Self {
        Self {
            platform,
            settings,
            counters,
            pipeline,
            admins,
            username: None,
        }
    }

    /// Sets the bot's own username so `/cmd@otherbot` is ignored.
    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`BotError`] when a reply cannot be sent or a setting cannot be
    /// read or written. Pipeline failures are reported to the user and logged,
    /// not returned.
    #[instrument(skip_all, fields(chat_id = message.chat_id, message_id = message.message_id))]
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<(), BotError> {
        if let Some(command) = parse_command(&message.text, self.username.as_deref()) {
            return self.handle_command(message, command).await;
        }

        let Some(link) = find_share_link(&message.text) else {
            debug!("no share link in message");
            return Ok(());
        };
        let Some(user_id) = message.user_id else {
            debug!("share link without sender ignored");
            return Ok(());
        };

        if let Some(denied) =
            ensure_joined(self.platform.as_ref(), self.settings.as_ref(), user_id).await?
        {
            self.reply(message, &format!("Access denied: {denied}")).await?;
            return Ok(());
        }

        let incoming = IncomingLink {
            requester: Requester {
                chat_id: message.chat_id,
                user_id,
                username: message.username.clone(),
            },
            message_id: message.message_id,
            link,
        };
        // Already rendered into the status message and logged by the pipeline.
        let _ = self.pipeline.run(&incoming).await;
        Ok(())
    }

    async fn handle_command(&self, message: &InboundMessage, command: Command) -> Result<(), BotError> {
        if command.requires_admin() && !message.user_id.is_some_and(|id| self.admins.is_admin(id)) {
            info!(user_id = ?message.user_id, ?command, "admin command refused");
            return self.reply(message, NOT_AUTHORIZED_TEXT).await;
        }

        let reply = match command {
            Command::Start => START_TEXT.to_string(),
            Command::Help => HELP_TEXT.to_string(),
            Command::Stats => {
                let resolved = self.counters.get(CounterKey::ResolvedLinks).await?;
                let uploaded = self.counters.get(CounterKey::UploadedFiles).await?;
                format!("Resolved links: {resolved}\nUploaded files: {uploaded}")
            }
            Command::SetDumbChannel(None) => {
                "Usage: /set_dumb_channel <channel_username_or_id>".to_string()
            }
            Command::SetDumbChannel(Some(raw)) => {
                self.set_channel(SettingKey::DumbChannel, &raw, "Dumb channel set to", "Failed to set dumb channel")
                    .await?
            }
            Command::RemoveDumbChannel => {
                self.settings.delete(SettingKey::DumbChannel).await?;
                "Dumb channel removed.".to_string()
            }
            Command::SetForceSub(None) => {
                "Usage: /set_force_sub <channel_username_or_id>".to_string()
            }
            Command::SetForceSub(Some(raw)) => {
                self.set_channel(SettingKey::ForceSub, &raw, "Force-sub set to", "Failed to set force-sub")
                    .await?
            }
            Command::RemoveForceSub => {
                self.settings.delete(SettingKey::ForceSub).await?;
                "Force-sub removed.".to_string()
            }
            Command::SetApiTemplate(None) => "Usage: /set_api_template <api_url_template>".to_string(),
            Command::SetApiTemplate(Some(template)) => {
                if template.contains(LINK_PLACEHOLDER) {
                    self.settings.set(SettingKey::ApiTemplate, &template).await?;
                    info!("resolver template updated");
                    "API template updated.".to_string()
                } else {
                    format!("Template must contain {LINK_PLACEHOLDER}.")
                }
            }
        };
        self.reply(message, &reply).await
    }

    /// Verifies the chat through the platform, then stores its normalized reference.
    async fn set_channel(
        &self,
        key: SettingKey,
        raw: &str,
        success: &str,
        failure: &str,
    ) -> Result<String, BotError> {
        let Some(channel) = ChatRef::parse(raw) else {
            return Ok(format!("{failure}: invalid chat reference '{raw}'"));
        };
        match self.platform.chat_info(&channel).await {
            Ok(_) => {
                self.settings.set(key, &channel.to_string()).await?;
                info!(setting = %key, channel = %channel, "channel setting updated");
                Ok(format!("{success} {channel}"))
            }
            Err(error) => Ok(format!("{failure}: {error}")),
        }
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<(), BotError> {
        self.platform
            .send_text(&ChatRef::Id(message.chat_id), text, Some(message.message_id))
            .await?;
        Ok(())
    }
}
