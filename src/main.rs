//! Entry point for the Terabox relay bot.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::bot::{AdminList, Bot, POLL_TIMEOUT_SECS, run_polling};
use relay_core::platform::TelegramClient;
use relay_core::store::{SettingKey, SqliteStore};
use relay_core::{Database, LinkResolver, Pipeline, TransferClient};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads its env fallbacks
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Args carries the bot token, so only the tunables are logged.
    debug!(
        spool_limit_mb = args.spool_limit_mb,
        max_file_size = args.max_file_size,
        download_timeout_secs = args.download_timeout_secs,
        resolver_timeout_secs = args.resolver_timeout_secs,
        api_base = %args.api_base,
        "configuration loaded"
    );
    info!(db = %args.db_path.display(), "terabox relay starting");

    let db = Database::new(&args.db_path)
        .await
        .with_context(|| format!("opening database {}", args.db_path.display()))?;
    let store = Arc::new(SqliteStore::new(db));
    if store
        .set_if_absent(SettingKey::ApiTemplate, &args.api_template)
        .await?
    {
        debug!("seeded resolver template from configuration");
    }

    let admins = AdminList::from_csv(&args.admin_ids);
    if admins.is_empty() {
        warn!("no admin ids configured; admin commands are disabled");
    }

    let telegram = TelegramClient::new(&args.bot_token, &args.api_base)?;
    let resolver = LinkResolver::new(store.clone(), &args.api_template)?
        .with_timeout(args.resolver_timeout());
    let transfer = TransferClient::new()?;

    let platform = Arc::new(telegram.clone());
    let pipeline = Pipeline::new(
        platform.clone(),
        store.clone(),
        store.clone(),
        resolver,
        transfer,
        args.pipeline_config(),
    );

    let username = match telegram.get_me().await {
        Ok(me) => {
            info!(username = ?me.username, "connected to Bot API");
            me.username
        }
        Err(error) => {
            warn!(error = %error, "getMe failed; accepting commands addressed to any bot");
            None
        }
    };

    let bot = Bot::new(platform, store.clone(), store, pipeline, admins).with_username(username);

    run_polling(&telegram, Arc::new(bot), POLL_TIMEOUT_SECS, async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("terabox relay stopped");
    Ok(())
}
