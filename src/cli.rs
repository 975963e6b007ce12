//! CLI argument definitions using clap derive macros.
//!
//! Every option can also come from the environment (or a `.env` file).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use relay_core::download::constants::{DEFAULT_SPOOL_LIMIT_MB, MIB};
use relay_core::pipeline::PipelineConfig;
use relay_core::platform::telegram::DEFAULT_API_BASE;
use relay_core::resolver::{DEFAULT_API_TEMPLATE, DEFAULT_RESOLVER_TIMEOUT_SECS};

/// Telegram bot that resolves Terabox share links and relays the files.
///
/// Files are streamed through a memory/disk spool and uploaded to the
/// requester, optionally archiving a copy in a dumb channel first.
#[derive(Parser, Debug)]
#[command(name = "terabox-relay")]
#[command(author, version, about)]
pub struct Args {
    /// Bot API token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Comma-separated user ids allowed to run admin commands
    #[arg(long, env = "ADMIN_ID", default_value = "")]
    pub admin_ids: String,

    /// Resolver URL template; `{link}` is replaced by the encoded share link
    #[arg(long, env = "API_TEMPLATE", default_value = DEFAULT_API_TEMPLATE)]
    pub api_template: String,

    /// Megabytes kept in memory before spooling to disk
    #[arg(long, env = "TMP_SPOOL_LIMIT_MB", default_value_t = DEFAULT_SPOOL_LIMIT_MB)]
    pub spool_limit_mb: u64,

    /// Maximum file size in bytes (0 for no limit)
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 0, value_parser = parse_zero_when_empty)]
    pub max_file_size: u64,

    /// SQLite database file for settings and counters
    #[arg(long, env = "DB_FILE", default_value = "bot_data.db")]
    pub db_path: PathBuf,

    /// Whole-download timeout in seconds (0 to wait indefinitely)
    #[arg(long, env = "DOWNLOAD_TIMEOUT_SECS", default_value_t = 0, value_parser = parse_zero_when_empty)]
    pub download_timeout_secs: u64,

    /// Resolver API timeout in seconds (0 to wait indefinitely)
    #[arg(long, env = "RESOLVER_TIMEOUT_SECS", default_value_t = DEFAULT_RESOLVER_TIMEOUT_SECS)]
    pub resolver_timeout_secs: u64,

    /// Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parses a `0 = off` number; a blank value (e.g. `MAX_FILE_SIZE=` in `.env`) means 0.
fn parse_zero_when_empty(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse()
        .map_err(|e| format!("expected a non-negative integer: {e}"))
}

fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Args {
    /// Default tracing level; `RUST_LOG` takes precedence.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            spool_limit_bytes: self.spool_limit_mb.saturating_mul(MIB),
            max_size_bytes: self.max_file_size,
            transfer_timeout: optional_secs(self.download_timeout_secs),
        }
    }

    #[must_use]
    pub fn resolver_timeout(&self) -> Option<Duration> {
        optional_secs(self.resolver_timeout_secs)
    }
}
