//! Telegram Bot HTTP API client.
//!
//! Every method is a POST to `{api_base}/bot{token}/{method}`. JSON bodies are
//! used for plain calls; uploads are `multipart/form-data` with the file part
//! streamed out of the [`SpooledBuffer`] through a bounded channel, so upload
//! progress tracks bytes actually handed to the connection.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::error::PlatformError;
use super::types::{ChatInfo, ChatRef, MediaKind, MediaUpload, MemberStatus, MessageRef};
use super::MessagingPlatform;
use crate::download::constants::CHUNK_SIZE;
use crate::download::{ProgressReporter, ProgressSink, SpooledBuffer};
use crate::http_client::{HttpClientOptions, build_http_client};
use crate::user_agent;

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Extra time granted to a long poll beyond its server-side timeout.
const POLL_GRACE_SECS: u64 = 10;

/// Upload chunks buffered between the source reader and the connection.
const UPLOAD_CHANNEL_DEPTH: usize = 4;

/// One entry of `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    /// Absent for edited messages, channel posts and other update kinds.
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

/// Message as returned by the Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: ChatInfo,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TelegramMessage {
    #[must_use]
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.chat.id, self.message_id)
    }
}

/// Sender of a message.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageIdResult {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ChatMemberResult {
    status: MemberStatus,
}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Creates a client for `token` against `api_base` (normally [`DEFAULT_API_BASE`]).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, PlatformError> {
        let client = build_http_client(&HttpClientOptions {
            name: "telegram",
            user_agent: user_agent::default_transfer_user_agent(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        })
        .map_err(|e| PlatformError::ClientBuild {
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: &Value,
    ) -> Result<T, PlatformError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| PlatformError::transport(method, e))?;
        decode_response(method, response).await
    }

    /// Identity of the bot itself.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] when the call fails.
    pub async fn get_me(&self) -> Result<TelegramUser, PlatformError> {
        self.call("getMe", &json!({})).await
    }

    /// Long-polls for message updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] when the call fails.
    #[instrument(skip(self))]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, PlatformError> {
        let method = "getUpdates";
        let mut params = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        let response = self
            .client
            .post(self.method_url(method))
            .json(&params)
            .timeout(Duration::from_secs(timeout_secs + POLL_GRACE_SECS))
            .send()
            .await
            .map_err(|e| PlatformError::transport(method, e))?;
        decode_response(method, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    method: &'static str,
    response: Response,
) -> Result<T, PlatformError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PlatformError::transport(method, e))?;
    let parsed: ApiResponse<T> = serde_json::from_str(&body)
        .map_err(|e| PlatformError::decode(method, format!("HTTP {status}: {e}")))?;

    if !parsed.ok {
        return Err(PlatformError::Api {
            method,
            code: parsed.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
            description: parsed.description.unwrap_or_default(),
        });
    }
    parsed
        .result
        .ok_or_else(|| PlatformError::decode(method, "missing result"))
}

/// Feeds `source` into the upload channel, reporting progress per chunk.
///
/// Returns the number of bytes handed to the connection. A closed channel
/// means the request ended early; the request's own result explains why.
async fn pump_source(
    source: &mut SpooledBuffer,
    tx: mpsc::Sender<Result<Vec<u8>, io::Error>>,
    total: u64,
    progress: &dyn ProgressSink,
) -> Result<u64, io::Error> {
    let mut reporter = ProgressReporter::new(progress, total);
    let mut sent: u64 = 0;
    loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let read = match source.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) => {
                // Abort the request body as well.
                let _ = tx
                    .send(Err(io::Error::new(error.kind(), error.to_string())))
                    .await;
                return Err(error);
            }
        };
        chunk.truncate(read);
        if tx.send(Ok(chunk)).await.is_err() {
            debug!(sent, "upload body closed before source was drained");
            return Ok(sent);
        }
        sent += read as u64;
        reporter.advance(sent).await;
    }
    reporter.finish(sent).await;
    Ok(sent)
}

#[async_trait]
impl MessagingPlatform for TelegramClient {
    async fn send_text(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<MessageRef, PlatformError> {
        let mut params = json!({ "chat_id": chat, "text": text });
        if let Some(message_id) = reply_to {
            params["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }
        let message: TelegramMessage = self.call("sendMessage", &params).await?;
        Ok(message.message_ref())
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), PlatformError> {
        let params = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "text": text,
        });
        let _: Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    #[instrument(skip(self, upload, source, progress), fields(chat = %chat, bytes = upload.total_bytes))]
    async fn send_media(
        &self,
        chat: &ChatRef,
        upload: &MediaUpload,
        source: &mut SpooledBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<MessageRef, PlatformError> {
        let method = upload.kind.api_method();
        let (tx, rx) = mpsc::channel::<Result<Vec<u8>, io::Error>>(UPLOAD_CHANNEL_DEPTH);
        let body = Body::wrap_stream(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));
        let part = Part::stream_with_length(body, upload.total_bytes)
            .file_name(upload.file_name.clone());

        let mut form = Form::new()
            .text("chat_id", chat.to_string())
            .text("caption", upload.caption.clone())
            .part(upload.kind.form_field(), part);
        if upload.kind == MediaKind::Video {
            form = form.text("supports_streaming", "true");
        }

        let request = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send();
        let pump = pump_source(source, tx, upload.total_bytes, progress);
        let (response, pumped) = tokio::join!(request, pump);

        let sent = pumped.map_err(|source| PlatformError::Source { method, source })?;
        let response = response.map_err(|e| PlatformError::transport(method, e))?;
        let message: TelegramMessage = decode_response(method, response).await?;
        debug!(sent, message_id = message.message_id, "upload accepted");
        Ok(message.message_ref())
    }

    async fn copy_message(&self, to: &ChatRef, message: &MessageRef) -> Result<i64, PlatformError> {
        let params = json!({
            "chat_id": to,
            "from_chat_id": message.chat_id,
            "message_id": message.message_id,
        });
        let copied: MessageIdResult = self.call("copyMessage", &params).await?;
        Ok(copied.message_id)
    }

    async fn member_status(&self, chat: &ChatRef, user_id: i64) -> Result<MemberStatus, PlatformError> {
        let params = json!({ "chat_id": chat, "user_id": user_id });
        let member: ChatMemberResult = self.call("getChatMember", &params).await?;
        Ok(member.status)
    }

    async fn chat_info(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError> {
        self.call("getChat", &json!({ "chat_id": chat })).await
    }
}
