//! Terabox relay core library
//!
//! Resolves Terabox share links through a configurable resolver API, streams
//! the resulting file through a spooled memory/disk buffer, and delivers it
//! to a Telegram chat, optionally archiving it in a dumb channel first.
//!
//! # Architecture
//!
//! - [`bot`] - Command dispatch, admin/force-sub gating, long polling
//! - [`pipeline`] - One share link from status message to delivered file
//! - [`resolver`] - Resolver API client (template read per call)
//! - [`parser`] - Share link detection and direct URL extraction
//! - [`download`] - Streaming transfer into a [`SpooledBuffer`] with throttled progress
//! - [`delivery`] - Archive-then-copy or direct upload with fallback
//! - [`platform`] - Messaging platform seam and the Bot API client
//! - [`store`] - Persistent settings and counters
//! - [`db`] - SQLite connection and migrations

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod db;
pub mod delivery;
pub mod download;
pub(crate) mod http_client;
pub mod parser;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod store;
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use bot::{Bot, BotError};
pub use db::Database;
pub use delivery::{Deliverer, DeliveryError, DeliveryOutcome};
pub use download::{
    ProgressEvent, ProgressSink, SpooledBuffer, TransferClient, TransferError, TransferRequest,
    TransferResult,
};
pub use parser::{extract_direct_url, find_share_link};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use platform::{MessagingPlatform, PlatformError, TelegramClient};
pub use resolver::{LinkResolver, ResolveError};
pub use store::{CounterStore, SettingsStore, SqliteStore, StoreError};
