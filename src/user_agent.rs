//! Shared User-Agent strings for transfer and resolver HTTP clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/terabox-relay";

/// Default User-Agent for direct file transfers.
#[must_use]
pub(crate) fn default_transfer_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("terabox-relay/{version} (+{PROJECT_UA_URL})")
}

/// Default User-Agent for resolver API calls.
#[must_use]
pub(crate) fn default_resolver_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("terabox-relay/{version} (resolver; +{PROJECT_UA_URL})")
}
