//! Shared HTTP client construction policy.
//!
//! The transfer engine, the resolver and the Telegram adapter all build their
//! `reqwest` clients here so connect timeout, compression and proxy handling
//! stay consistent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

/// Knobs that differ between the crate's HTTP clients.
#[derive(Debug, Clone)]
pub(crate) struct HttpClientOptions {
    /// Used for logging only.
    pub name: &'static str,
    pub user_agent: String,
    pub connect_timeout: Duration,
}

/// Failure to construct a client.
#[derive(Debug, thiserror::Error)]
pub(crate) enum BuildClientError {
    #[error("HTTP client construction panicked while initializing {name} networking")]
    Panicked { name: &'static str },
    #[error("HTTP client construction failed: {0}")]
    Build(#[from] reqwest::Error),
}

/// Builds a client, retrying with an env-only proxy policy when the system
/// proxy lookup panics.
pub(crate) fn build_http_client(options: &HttpClientOptions) -> Result<Client, BuildClientError> {
    match try_build_client(options, false) {
        Ok(client) => Ok(client),
        Err(BuildClientError::Panicked { .. }) => {
            // Some sandboxed environments panic when querying system proxy
            // settings.
            warn!(
                client = options.name,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            try_build_client(options, true)
        }
        Err(error) => Err(error),
    }
}

fn try_build_client(
    options: &HttpClientOptions,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientError> {
    let name = options.name;
    catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(options);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientError::Build)
    }))
    .map_err(|_| BuildClientError::Panicked { name })?
}

fn base_builder(options: &HttpClientOptions) -> ClientBuilder {
    // Whole-request timeouts differ per call and are set on each request.
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .user_agent(options.user_agent.clone())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
