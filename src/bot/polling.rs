//! Telegram long-polling loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Bot, InboundMessage};
use crate::platform::TelegramClient;

/// Server-side wait of each `getUpdates` call.
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(3);

/// Polls for updates until `shutdown` resolves, spawning one task per message.
///
/// In-flight message tasks are not cancelled by shutdown.
pub async fn run_polling(
    telegram: &TelegramClient,
    bot: Arc<Bot>,
    poll_timeout_secs: u64,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut offset: Option<i64> = None;
    info!("polling for updates");

    loop {
        let updates = tokio::select! {
            () = &mut shutdown => {
                info!("shutdown requested, polling stopped");
                break;
            }
            updates = telegram.get_updates(offset, poll_timeout_secs) => updates,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(error) => {
                warn!(error = %error, "getUpdates failed, retrying");
                tokio::time::sleep(POLL_ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message.as_ref().and_then(InboundMessage::from_telegram) else {
                debug!(update_id = update.update_id, "skipping non-text update");
                continue;
            };
            let bot = Arc::clone(&bot);
            tokio::spawn(async move {
                if let Err(error) = bot.handle_message(&message).await {
                    warn!(chat_id = message.chat_id, error = %error, "message handling failed");
                }
            });
        }
    }
}
