//! HTTP client wrapper for spooled transfers.
//!
//! This module provides the [`TransferClient`] struct which streams a direct
//! URL into a [`SpooledBuffer`] while enforcing size limits and reporting
//! throttled progress.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, DEFAULT_SPOOL_LIMIT_MB, MIB};
use super::error::TransferError;
use super::filename::filename_hint;
use super::progress::{ProgressReporter, ProgressSink};
use super::spool::SpooledBuffer;
use crate::http_client::{HttpClientOptions, build_http_client};
use crate::user_agent;

/// Parameters of one transfer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    url: String,
    spool_limit_bytes: u64,
    max_size_bytes: u64,
    timeout: Option<Duration>,
}

impl TransferRequest {
    /// Creates a request with the default spool limit, no size limit and no timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            spool_limit_bytes: DEFAULT_SPOOL_LIMIT_MB * MIB,
            max_size_bytes: 0,
            timeout: None,
        }
    }

    /// Sets the in-memory ceiling in bytes.
    #[must_use]
    pub fn with_spool_limit(mut self, bytes: u64) -> Self {
        self.spool_limit_bytes = bytes;
        self
    }

    /// Sets the maximum accepted size in bytes; 0 means unlimited.
    #[must_use]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Sets the whole-request timeout; `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The direct URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// In-memory ceiling in bytes.
    #[must_use]
    pub fn spool_limit_bytes(&self) -> u64 {
        self.spool_limit_bytes
    }

    /// Maximum accepted size in bytes (0 = unlimited).
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Whole-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn size_limit(&self) -> Option<u64> {
        (self.max_size_bytes > 0).then_some(self.max_size_bytes)
    }
}

/// A completed transfer.
///
/// The caller owns `buffer`; dropping the result releases memory and the
/// temporary file.
#[derive(Debug)]
pub struct TransferResult {
    /// Content, positioned at byte 0.
    pub buffer: SpooledBuffer,
    /// Bytes received.
    pub total_bytes: u64,
    /// `Content-Type` header, when present and non-empty.
    pub content_type: Option<String>,
    /// Display filename for the upload.
    pub filename_hint: String,
}

/// HTTP client for spooled transfers.
///
/// Created once and shared by every pipeline so connections are pooled.
/// The client itself has only a connect timeout; whole-request timeouts are
/// applied per [`TransferRequest`].
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
}

impl TransferClient {
    /// Creates a client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TransferError> {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a client with an explicit connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, TransferError> {
        let client = build_http_client(&HttpClientOptions {
            name: "transfer",
            user_agent: user_agent::default_transfer_user_agent(),
            connect_timeout,
        })
        .map_err(TransferError::client_build)?;
        Ok(Self { client })
    }

    /// Streams `request.url()` into a spooled buffer.
    ///
    /// # Errors
    ///
    /// - [`TransferError::DownloadFailed`] for a non-success status (no body read)
    /// - [`TransferError::TooLarge`] when the advertised or received size exceeds the limit
    /// - [`TransferError::Transport`] / [`TransferError::Timeout`] for network faults
    /// - [`TransferError::Spool`] when buffering fails
    #[instrument(skip(self, request, progress), fields(url = %request.url()))]
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransferResult, TransferError> {
        let url = request.url();
        Url::parse(url).map_err(|_| TransferError::invalid_url(url))?;
        debug!("starting transfer");

        let mut builder = self.client.get(url);
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "download rejected by server");
            return Err(TransferError::download_failed(url, status.as_u16()));
        }

        let declared = response.content_length().filter(|len| *len > 0);
        if let (Some(limit), Some(declared)) = (request.size_limit(), declared)
            && declared > limit
        {
            return Err(TransferError::too_large(limit, declared));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let filename_hint = filename_hint(response.headers(), response.url());
        debug!(filename = %filename_hint, declared = ?declared, "response accepted");

        let total = declared.unwrap_or(0);
        let mut buffer = SpooledBuffer::new(request.spool_limit_bytes());
        let mut reporter = ProgressReporter::new(progress, total);
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| TransferError::from_reqwest(url, e))?;
            for piece in chunk.chunks(CHUNK_SIZE) {
                buffer
                    .write_chunk(piece)
                    .await
                    .map_err(TransferError::spool)?;
                downloaded += piece.len() as u64;

                if let Some(limit) = request.size_limit()
                    && downloaded > limit
                {
                    // Partial buffer is dropped with this frame.
                    return Err(TransferError::too_large(limit, downloaded));
                }
                reporter.advance(downloaded).await;
            }
        }

        reporter.finish(downloaded).await;
        buffer.rewind().await.map_err(TransferError::spool)?;

        info!(
            bytes = downloaded,
            spilled = buffer.is_spilled(),
            "transfer complete"
        );

        Ok(TransferResult {
            buffer,
            total_bytes: downloaded,
            content_type,
            filename_hint,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::download::progress::{NoProgress, ProgressEvent, SinkError};
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
    }

    #[async_trait]
    impl ProgressSink for Recorder {
        async fn on_progress(&self, event: ProgressEvent) -> Result<(), SinkError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn client() -> TransferClient {
        TransferClient::new().unwrap()
    }

    #[tokio::test]
    async fn test_transfer_success_returns_rewound_buffer() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "video/mp4")
                    .set_body_bytes(b"video bytes".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let request = TransferRequest::new(format!("{}/clip.mp4", mock_server.uri()));
        let mut result = client().transfer(&request, &NoProgress).await.unwrap();

        assert_eq!(result.total_bytes, 11);
        assert_eq!(result.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(result.filename_hint, "clip.mp4");
        let mut body = Vec::new();
        result.buffer.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"video bytes");
    }

    #[tokio::test]
    async fn test_transfer_uses_content_disposition_filename() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/d"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", r#"attachment; filename="movie.mkv""#)
                    .set_body_bytes(b"x".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let request = TransferRequest::new(format!("{}/d", mock_server.uri()));
        let result = client().transfer(&request, &NoProgress).await.unwrap();

        assert_eq!(result.filename_hint, "movie.mkv");
    }

    #[tokio::test]
    async fn test_transfer_non_success_status_fails() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let request = TransferRequest::new(format!("{}/gone", mock_server.uri()));
        let recorder = Recorder::default();
        let result = client().transfer(&request, &recorder).await;

        match result {
            Err(TransferError::DownloadFailed { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected DownloadFailed, got: {other:?}"),
        }
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_declared_length_over_limit_fails_before_streaming() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&mock_server)
            .await;

        let request =
            TransferRequest::new(format!("{}/big.bin", mock_server.uri())).with_max_size(1000);
        let recorder = Recorder::default();
        let result = client().transfer(&request, &recorder).await;

        match result {
            Err(TransferError::TooLarge { limit, actual }) => {
                assert_eq!(limit, 1000);
                assert_eq!(actual, 4096);
            }
            other => panic!("Expected TooLarge, got: {other:?}"),
        }
        assert!(
            recorder.events.lock().unwrap().is_empty(),
            "no progress may be reported when the eager check trips"
        );
    }

    #[tokio::test]
    async fn test_transfer_emits_single_final_event_and_bounded_count() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 3 * 1024 * 1024]))
            .mount(&mock_server)
            .await;

        let request = TransferRequest::new(format!("{}/file.bin", mock_server.uri()))
            .with_spool_limit(256 * 1024);
        let recorder = Recorder::default();
        let result = client().transfer(&request, &recorder).await.unwrap();

        assert!(result.buffer.is_spilled());
        let events = recorder.events.lock().unwrap();
        assert!(events.len() <= 51, "got {} events", events.len());
        assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(events.iter().filter(|e| e.percent == 100).count(), 1);
        let last = events.last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.bytes_transferred, 3 * 1024 * 1024);
        assert_eq!(last.total_bytes, 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_transfer_invalid_url() {
        let result = client()
            .transfer(&TransferRequest::new("not-a-url"), &NoProgress)
            .await;
        assert!(matches!(result, Err(TransferError::InvalidUrl { .. })));
    }

    #[test]
    fn test_transfer_request_defaults() {
        let request = TransferRequest::new("https://host/file.mp4");
        assert_eq!(request.spool_limit_bytes(), 16 * MIB);
        assert_eq!(request.max_size_bytes(), 0);
        assert_eq!(request.timeout(), None);
        assert_eq!(request.size_limit(), None);
    }
}
