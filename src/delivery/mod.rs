//! Delivery of a completed transfer to the requester.
//!
//! Two modes:
//!
//! - **archive**: upload once to the archive chat with an attribution caption,
//!   then copy that message to the requester. A failed copy falls back to a
//!   second, direct upload of the same buffer after rewinding it.
//! - **direct**: upload once to the requester.
//!
//! Status text on the requester's status message follows each step, and
//! upload progress is rendered into it through [`StatusProgress`].

mod error;

pub use error::DeliveryError;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::download::filename::extension_of;
use crate::download::{ProgressEvent, ProgressSink, SinkError, SpooledBuffer, TransferResult};
use crate::platform::{ChatRef, MediaKind, MediaUpload, MessageRef, MessagingPlatform};

/// Extensions uploaded as video when the content type does not say `video/*`.
pub const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".mkv", ".mov", ".webm", ".ts"];

/// Caption used for direct uploads to the requester.
pub const DIRECT_CAPTION: &str = "Here is your file";

const STATUS_ARCHIVE_UPLOAD: &str = "Uploading to dumb channel...";
const STATUS_COPYING: &str = "Copying file to you...";
const STATUS_DIRECT_UPLOAD: &str = "Uploading file to you...";
const PREFIX_ARCHIVE_UPLOAD: &str = "Uploading to dumb channel";
const PREFIX_DIRECT_UPLOAD: &str = "Uploading to you";

/// Who asked for the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
}

impl Requester {
    #[must_use]
    pub fn chat(&self) -> ChatRef {
        ChatRef::Id(self.chat_id)
    }

    /// Caption for the archive copy: `Saved for user @<username or id>`.
    #[must_use]
    pub fn attribution(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => format!("Saved for user @{name}"),
            _ => format!("Saved for user @{}", self.user_id),
        }
    }
}

/// How the file reached the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Uploaded straight to the requester.
    Direct { message: MessageRef },
    /// Stored in the archive; `copied` is false when the fallback upload was used.
    Archived {
        archive_message: MessageRef,
        copied: bool,
    },
}

/// Picks the upload call for a file.
#[must_use]
pub fn classify(content_type: Option<&str>, filename: &str) -> MediaKind {
    let declared_video = content_type.is_some_and(|ct| {
        ct.trim_start()
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("video"))
    });
    if declared_video {
        return MediaKind::Video;
    }
    match extension_of(filename) {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
        _ => MediaKind::Document,
    }
}

/// Which status line a [`StatusProgress`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLabel {
    Download,
    Upload(&'static str),
}

impl ProgressLabel {
    #[must_use]
    pub fn render(self, event: &ProgressEvent) -> String {
        let ProgressEvent {
            percent,
            bytes_transferred: done,
            total_bytes: total,
        } = *event;
        match (self, total) {
            (Self::Download, 0) => format!("Downloading: {done} bytes"),
            (Self::Download, _) => format!("Downloading: {percent}% ({done}/{total} bytes)"),
            (Self::Upload(prefix), 0) => format!("{prefix}: {percent}% ({done} bytes)"),
            (Self::Upload(prefix), _) => format!("{prefix}: {percent}% ({done}/{total} bytes)"),
        }
    }
}

/// Progress sink that edits a status message.
pub struct StatusProgress<'a> {
    platform: &'a dyn MessagingPlatform,
    status: MessageRef,
    label: ProgressLabel,
}

impl<'a> StatusProgress<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn MessagingPlatform, status: MessageRef, label: ProgressLabel) -> Self {
        Self {
            platform,
            status,
            label,
        }
    }
}

#[async_trait]
impl ProgressSink for StatusProgress<'_> {
    async fn on_progress(&self, event: ProgressEvent) -> Result<(), SinkError> {
        match self.platform.edit_text(&self.status, &self.label.render(&event)).await {
            Err(error) if !error.is_not_modified() => Err(error.into()),
            _ => Ok(()),
        }
    }
}

/// Replaces the status text; failures are logged and ignored.
pub async fn set_status(platform: &dyn MessagingPlatform, status: &MessageRef, text: &str) {
    if let Err(error) = platform.edit_text(status, text).await {
        debug!(error = %error, "status edit failed; ignoring");
    }
}

/// Drives the archive or direct upload of one transfer.
pub struct Deliverer<'a> {
    platform: &'a dyn MessagingPlatform,
}

impl<'a> Deliverer<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn MessagingPlatform) -> Self {
        Self { platform }
    }

    /// Delivers `result` to `requester`, through `archive` when configured.
    ///
    /// Consumes the transfer so the buffer is released when this returns.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::UploadFailed`] when the archive or direct upload fails
    /// - [`DeliveryError::FallbackFailed`] when the copy and then the fallback upload fail
    /// - [`DeliveryError::Rewind`] when the buffer cannot be repositioned
    #[instrument(skip_all, fields(chat_id = requester.chat_id, bytes = result.total_bytes, archived = archive.is_some()))]
    pub async fn deliver(
        &self,
        result: TransferResult,
        requester: &Requester,
        archive: Option<&ChatRef>,
        status: &MessageRef,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let TransferResult {
            mut buffer,
            total_bytes,
            content_type,
            filename_hint,
        } = result;
        let kind = classify(content_type.as_deref(), &filename_hint);
        let direct_upload = MediaUpload {
            kind,
            file_name: filename_hint.clone(),
            caption: DIRECT_CAPTION.to_string(),
            total_bytes,
        };
        debug!(?kind, file = %filename_hint, "classified");

        let Some(archive) = archive else {
            set_status(self.platform, status, STATUS_DIRECT_UPLOAD).await;
            let message = self
                .upload(&requester.chat(), &direct_upload, &mut buffer, status, PREFIX_DIRECT_UPLOAD)
                .await
                .map_err(|source| match source {
                    UploadStepError::Rewind(source) => DeliveryError::Rewind { source },
                    UploadStepError::Platform(source) => DeliveryError::UploadFailed {
                        destination: requester.chat(),
                        source,
                    },
                })?;
            info!(message_id = message.message_id, "delivered directly");
            return Ok(DeliveryOutcome::Direct { message });
        };

        set_status(self.platform, status, STATUS_ARCHIVE_UPLOAD).await;
        let archive_upload = MediaUpload {
            caption: requester.attribution(),
            ..direct_upload.clone()
        };
        let archive_message = self
            .upload(archive, &archive_upload, &mut buffer, status, PREFIX_ARCHIVE_UPLOAD)
            .await
            .map_err(|source| match source {
                UploadStepError::Rewind(source) => DeliveryError::Rewind { source },
                UploadStepError::Platform(source) => DeliveryError::UploadFailed {
                    destination: archive.clone(),
                    source,
                },
            })?;

        set_status(self.platform, status, STATUS_COPYING).await;
        let copy_error = match self
            .platform
            .copy_message(&requester.chat(), &archive_message)
            .await
        {
            Ok(_) => {
                info!(archive_message = archive_message.message_id, "archived and copied");
                return Ok(DeliveryOutcome::Archived {
                    archive_message,
                    copied: true,
                });
            }
            Err(error) => error,
        };

        warn!(error = %copy_error, "copy to requester failed, falling back to direct upload");
        self.upload(&requester.chat(), &direct_upload, &mut buffer, status, PREFIX_DIRECT_UPLOAD)
            .await
            .map_err(|source| match source {
                UploadStepError::Rewind(source) => DeliveryError::Rewind { source },
                UploadStepError::Platform(source) => DeliveryError::FallbackFailed {
                    copy_error,
                    source,
                },
            })?;
        info!(archive_message = archive_message.message_id, "archived, delivered by fallback upload");
        Ok(DeliveryOutcome::Archived {
            archive_message,
            copied: false,
        })
    }

    /// Rewinds `buffer` and uploads it whole to `chat`.
    async fn upload(
        &self,
        chat: &ChatRef,
        upload: &MediaUpload,
        buffer: &mut SpooledBuffer,
        status: &MessageRef,
        prefix: &'static str,
    ) -> Result<MessageRef, UploadStepError> {
        buffer.rewind().await.map_err(UploadStepError::Rewind)?;
        let progress = StatusProgress::new(self.platform, *status, ProgressLabel::Upload(prefix));
        self.platform
            .send_media(chat, upload, buffer, &progress)
            .await
            .map_err(UploadStepError::Platform)
    }
}

enum UploadStepError {
    Rewind(std::io::Error),
    Platform(crate::platform::PlatformError),
}
