//! Recording in-memory [`MessagingPlatform`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::download::{ProgressReporter, ProgressSink, SpooledBuffer};
use crate::platform::{
    ChatInfo, ChatRef, MediaUpload, MemberStatus, MessageRef, MessagingPlatform, PlatformError,
};

/// Chat id the fake assigns to every `@username` chat.
pub const USERNAME_CHAT_ID: i64 = -1_000;

#[derive(Debug, Clone)]
pub struct RecordedText {
    pub chat: ChatRef,
    pub text: String,
    pub reply_to: Option<i64>,
    pub message: MessageRef,
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub chat: ChatRef,
    pub upload: MediaUpload,
    /// Source position when the upload started.
    pub start_position: u64,
    pub bytes: Vec<u8>,
    pub message: MessageRef,
}

#[derive(Debug, Default)]
struct State {
    next_message_id: i64,
    texts: Vec<RecordedText>,
    edits: Vec<(MessageRef, String)>,
    uploads: Vec<RecordedUpload>,
    copies: Vec<(ChatRef, MessageRef)>,
}

#[derive(Debug, Default)]
pub struct FakePlatform {
    state: Mutex<State>,
    fail_copy: bool,
    fail_uploads_to: Vec<ChatRef>,
    fail_member_lookup: bool,
    fail_chat_info: bool,
    members: HashMap<i64, MemberStatus>,
}

fn api_error(method: &'static str, description: &str) -> PlatformError {
    PlatformError::Api {
        method,
        code: 400,
        description: description.to_string(),
    }
}

pub fn chat_id_of(chat: &ChatRef) -> i64 {
    match chat {
        ChatRef::Id(id) => *id,
        ChatRef::Username(_) => USERNAME_CHAT_ID,
    }
}

#[allow(clippy::unwrap_used)]
impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_copy_failure(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    #[must_use]
    pub fn with_upload_failure(mut self, chat: ChatRef) -> Self {
        self.fail_uploads_to.push(chat);
        self
    }

    #[must_use]
    pub fn with_member(mut self, user_id: i64, status: MemberStatus) -> Self {
        self.members.insert(user_id, status);
        self
    }

    #[must_use]
    pub fn with_member_lookup_failure(mut self) -> Self {
        self.fail_member_lookup = true;
        self
    }

    #[must_use]
    pub fn with_chat_info_failure(mut self) -> Self {
        self.fail_chat_info = true;
        self
    }

    fn next_message(&self, state: &mut State, chat: &ChatRef) -> MessageRef {
        state.next_message_id += 1;
        MessageRef::new(chat_id_of(chat), state.next_message_id)
    }

    pub fn texts(&self) -> Vec<RecordedText> {
        self.state.lock().unwrap().texts.clone()
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.state.lock().unwrap().edits.clone()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.edits().into_iter().map(|(_, text)| text).collect()
    }

    /// Text of the last edit, or the last sent text when nothing was edited.
    pub fn last_status(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .edits
            .last()
            .map(|(_, text)| text.clone())
            .or_else(|| state.texts.last().map(|t| t.text.clone()))
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn copies(&self) -> Vec<(ChatRef, MessageRef)> {
        self.state.lock().unwrap().copies.clone()
    }
}

#[allow(clippy::unwrap_used)]
#[async_trait]
impl MessagingPlatform for FakePlatform {
    async fn send_text(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<MessageRef, PlatformError> {
        let mut state = self.state.lock().unwrap();
        let message = self.next_message(&mut state, chat);
        state.texts.push(RecordedText {
            chat: chat.clone(),
            text: text.to_string(),
            reply_to,
            message,
        });
        Ok(message)
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .edits
            .push((*message, text.to_string()));
        Ok(())
    }

    async fn send_media(
        &self,
        chat: &ChatRef,
        upload: &MediaUpload,
        source: &mut SpooledBuffer,
        progress: &dyn ProgressSink,
    ) -> Result<MessageRef, PlatformError> {
        let start_position = source.stream_position().await.unwrap();
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes).await.unwrap();

        let mut reporter = ProgressReporter::new(progress, upload.total_bytes);
        reporter.advance(bytes.len() as u64 / 2).await;
        reporter.finish(bytes.len() as u64).await;

        let mut state = self.state.lock().unwrap();
        let message = self.next_message(&mut state, chat);
        state.uploads.push(RecordedUpload {
            chat: chat.clone(),
            upload: upload.clone(),
            start_position,
            bytes,
            message,
        });
        if self.fail_uploads_to.contains(chat) {
            return Err(api_error(upload.kind.api_method(), "Request Entity Too Large"));
        }
        Ok(message)
    }

    async fn copy_message(&self, to: &ChatRef, message: &MessageRef) -> Result<i64, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.copies.push((to.clone(), *message));
        if self.fail_copy {
            return Err(api_error("copyMessage", "Bad Request: message can't be copied"));
        }
        Ok(self.next_message(&mut state, to).message_id)
    }

    async fn member_status(&self, _chat: &ChatRef, user_id: i64) -> Result<MemberStatus, PlatformError> {
        if self.fail_member_lookup {
            return Err(api_error("getChatMember", "Bad Request: member list is inaccessible"));
        }
        Ok(self.members.get(&user_id).cloned().unwrap_or(MemberStatus::Left))
    }

    async fn chat_info(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError> {
        if self.fail_chat_info {
            return Err(api_error("getChat", "Bad Request: chat not found"));
        }
        Ok(ChatInfo {
            id: chat_id_of(chat),
            title: Some("Test chat".to_string()),
            username: None,
        })
    }
}
