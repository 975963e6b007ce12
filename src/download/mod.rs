//! Spooled transfer engine.
//!
//! Streams a direct URL into a [`SpooledBuffer`] that keeps small files in
//! memory and spills large ones to an anonymous temporary file, reporting
//! throttled progress on the way.
//!
//! # Example
//!
//! ```no_run
//! use relay_core::download::{NoProgress, TransferClient, TransferRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TransferClient::new()?;
//! let request = TransferRequest::new("https://cdn.example.com/clip.mp4")
//!     .with_max_size(2 * 1024 * 1024 * 1024);
//! let result = client.transfer(&request, &NoProgress).await?;
//! println!("{} bytes as {}", result.total_bytes, result.filename_hint);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub(crate) mod filename;
pub mod progress;
mod spool;

pub use client::{TransferClient, TransferRequest, TransferResult};
pub use error::TransferError;
pub use progress::{
    NoProgress, ProgressEvent, ProgressReporter, ProgressSink, ProgressThrottle, SinkError,
    percent_for,
};
pub use spool::SpooledBuffer;
