//! Request-scoped relay pipeline.
//!
//! One [`Pipeline::run`] per inbound share link:
//! resolve → extract → transfer → deliver. Every stage failure ends the run
//! and is rendered into the requester's status message; nothing is retried.
//! All mutable state (status message, buffer) belongs to the run.

mod error;

pub use error::PipelineError;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::delivery::{
    Deliverer, DeliveryOutcome, ProgressLabel, Requester, StatusProgress, set_status,
};
use crate::download::constants::{DEFAULT_SPOOL_LIMIT_MB, MIB};
use crate::download::{TransferClient, TransferRequest};
use crate::parser::{SNIPPET_MAX_CHARS, extract_direct_url, snippet};
use crate::platform::{ChatRef, MessageRef, MessagingPlatform};
use crate::resolver::LinkResolver;
use crate::store::{CounterKey, CounterStore, SettingKey, SettingsStore};

/// First status line, sent as a reply to the link.
pub const STATUS_RESOLVING: &str = "Resolving your Terabox link...";
/// Final status after archive delivery.
pub const STATUS_DONE_ARCHIVED: &str = "Done! File stored in dumb channel and delivered to you.";
/// Final status after direct delivery.
pub const STATUS_DONE_DIRECT: &str = "Done! Uploaded to you.";

/// Transfer limits applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub spool_limit_bytes: u64,
    /// 0 = unlimited.
    pub max_size_bytes: u64,
    /// `None` = unbounded.
    pub transfer_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spool_limit_bytes: DEFAULT_SPOOL_LIMIT_MB * MIB,
            max_size_bytes: 0,
            transfer_timeout: None,
        }
    }
}

/// A share link that passed access checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingLink {
    pub requester: Requester,
    /// Message that carried the link; the status message replies to it.
    pub message_id: i64,
    pub link: String,
}

/// Shared collaborators of all runs.
pub struct Pipeline {
    platform: Arc<dyn MessagingPlatform>,
    settings: Arc<dyn SettingsStore>,
    counters: Arc<dyn CounterStore>,
    resolver: LinkResolver,
    transfer: TransferClient,
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        settings: Arc<dyn SettingsStore>,
        counters: Arc<dyn CounterStore>,
        resolver: LinkResolver,
        transfer: TransferClient,
        config: PipelineConfig,
    ) -> Self {
        Self {
            platform,
            settings,
            counters,
            resolver,
            transfer,
            config,
        }
    }

    /// Runs the pipeline for one link and leaves the final state in the status message.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the stage that ended the run. It has
    /// already been shown to the requester unless it is
    /// [`PipelineError::Status`].
    #[instrument(skip_all, fields(chat_id = incoming.requester.chat_id, user_id = incoming.requester.user_id))]
    pub async fn run(&self, incoming: &IncomingLink) -> Result<DeliveryOutcome, PipelineError> {
        let status = self
            .platform
            .send_text(
                &incoming.requester.chat(),
                STATUS_RESOLVING,
                Some(incoming.message_id),
            )
            .await
            .map_err(PipelineError::Status)?;

        match self.execute(incoming, &status).await {
            Ok(outcome) => {
                let done = match outcome {
                    DeliveryOutcome::Archived { .. } => STATUS_DONE_ARCHIVED,
                    DeliveryOutcome::Direct { .. } => STATUS_DONE_DIRECT,
                };
                set_status(self.platform.as_ref(), &status, done).await;
                info!(?outcome, "pipeline finished");
                Ok(outcome)
            }
            Err(failure) => {
                error!(error = %failure, "pipeline failed");
                set_status(self.platform.as_ref(), &status, &failure.to_string()).await;
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        incoming: &IncomingLink,
        status: &MessageRef,
    ) -> Result<DeliveryOutcome, PipelineError> {
        let response = self.resolver.resolve(&incoming.link).await?;
        let Some(direct_url) = extract_direct_url(&response.data) else {
            return Err(PipelineError::Extract {
                snippet: snippet(&response.data, SNIPPET_MAX_CHARS),
            });
        };
        self.bump(CounterKey::ResolvedLinks).await;

        let request = TransferRequest::new(direct_url)
            .with_spool_limit(self.config.spool_limit_bytes)
            .with_max_size(self.config.max_size_bytes)
            .with_timeout(self.config.transfer_timeout);
        let progress = StatusProgress::new(self.platform.as_ref(), *status, ProgressLabel::Download);
        let result = self.transfer.transfer(&request, &progress).await?;

        let archive = self.archive_destination().await?;
        let outcome = Deliverer::new(self.platform.as_ref())
            .deliver(result, &incoming.requester, archive.as_ref(), status)
            .await?;
        self.bump(CounterKey::UploadedFiles).await;
        Ok(outcome)
    }

    /// Archive chat from the `dumb_channel` setting, read fresh for this run.
    async fn archive_destination(&self) -> Result<Option<ChatRef>, PipelineError> {
        let Some(raw) = self.settings.get(SettingKey::DumbChannel).await? else {
            return Ok(None);
        };
        let parsed = ChatRef::parse(&raw);
        if parsed.is_none() {
            warn!(value = %raw, "ignoring unparseable dumb channel setting");
        }
        Ok(parsed)
    }

    async fn bump(&self, key: CounterKey) {
        if let Err(error) = self.counters.increment(key, 1).await {
            warn!(counter = %key, busy = error.is_busy_or_locked(), error = %error, "counter update failed");
        }
    }
}
