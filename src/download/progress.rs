//! Throttled progress reporting for transfers and uploads.
//!
//! Progress flows from a byte-counting loop into a [`ProgressSink`] through a
//! [`ProgressReporter`], which decides which observations become events:
//!
//! - percent is `done * 100 / total` when the total is known, otherwise one
//!   point per MiB received
//! - in-flight percents never exceed 99; the only 100% event is the one
//!   emitted by [`ProgressReporter::finish`]
//! - an event is emitted only when the percent changed and is even
//!
//! That bounds a transfer to at most 51 events regardless of its size.

use async_trait::async_trait;
use tracing::debug;

use super::constants::MIB;

/// Error type returned by progress sinks. Always swallowed by the reporter.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Highest percent reported before the transfer has completed.
const IN_FLIGHT_CAP: u8 = 99;

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 0..=100.
    pub percent: u8,
    /// Bytes transferred so far.
    pub bytes_transferred: u64,
    /// Expected total, or 0 when unknown.
    pub total_bytes: u64,
}

/// Receiver of progress events (status message editor, test recorder, ...).
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Handles one event. Errors are logged and ignored by the caller.
    async fn on_progress(&self, event: ProgressEvent) -> Result<(), SinkError>;
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn on_progress(&self, _event: ProgressEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Percent for `done` bytes out of `total` (0 = unknown), before capping.
#[must_use]
pub fn percent_for(done: u64, total: u64) -> u8 {
    if total > 0 {
        let percent = u128::from(done) * 100 / u128::from(total);
        u8::try_from(percent.min(100)).unwrap_or(100)
    } else {
        u8::try_from((done / MIB).min(u64::from(IN_FLIGHT_CAP))).unwrap_or(IN_FLIGHT_CAP)
    }
}

/// Pure emission policy, separated from the async sink for testing.
#[derive(Debug, Clone, Default)]
pub struct ProgressThrottle {
    last_percent: Option<u8>,
}

impl ProgressThrottle {
    /// Creates a throttle that has emitted nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the event to emit for this observation, if any.
    pub fn observe(&mut self, done: u64, total: u64) -> Option<ProgressEvent> {
        let percent = percent_for(done, total).min(IN_FLIGHT_CAP);
        if self.last_percent == Some(percent) || percent % 2 != 0 {
            return None;
        }
        self.last_percent = Some(percent);
        Some(ProgressEvent {
            percent,
            bytes_transferred: done,
            total_bytes: total,
        })
    }

    /// Returns the terminal 100% event.
    pub fn finish(&mut self, done: u64, total: u64) -> ProgressEvent {
        self.last_percent = Some(100);
        ProgressEvent {
            percent: 100,
            bytes_transferred: done,
            total_bytes: total,
        }
    }
}

/// Applies a [`ProgressThrottle`] in front of a [`ProgressSink`].
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    throttle: ProgressThrottle,
    total: u64,
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter for a transfer of `total` bytes (0 = unknown).
    #[must_use]
    pub fn new(sink: &'a dyn ProgressSink, total: u64) -> Self {
        Self {
            sink,
            throttle: ProgressThrottle::new(),
            total,
        }
    }

    /// Records that `done` bytes have been transferred.
    pub async fn advance(&mut self, done: u64) {
        if let Some(event) = self.throttle.observe(done, self.total) {
            self.emit(event).await;
        }
    }

    /// Emits the terminal 100% event.
    pub async fn finish(&mut self, done: u64) {
        let event = self.throttle.finish(done, self.total);
        self.emit(event).await;
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Err(error) = self.sink.on_progress(event).await {
            debug!(percent = event.percent, error = %error, "progress sink failed; ignoring");
        }
    }
}
