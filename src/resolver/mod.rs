//! Share-link resolution through a templated HTTP API.
//!
//! The resolver turns a share link into whatever the configured API returns.
//! The request URL is the stored `api_template` setting (or the built-in
//! default) with `{link}` replaced by the percent-encoded share link.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_core::db::Database;
//! use relay_core::resolver::{DEFAULT_API_TEMPLATE, LinkResolver};
//! use relay_core::store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new(Database::new_in_memory().await?));
//! let resolver = LinkResolver::new(store, DEFAULT_API_TEMPLATE)?;
//! let response = resolver.resolve("https://terabox.com/s/abc").await?;
//! println!("status {}", response.status_code);
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::ResolveError;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::http_client::{HttpClientOptions, build_http_client};
use crate::store::{SettingKey, SettingsStore};
use crate::user_agent;

/// Template used when no `api_template` setting is stored.
pub const DEFAULT_API_TEMPLATE: &str = "https://teradl.tiiny.io/?key=RushVx&link={link}";

/// Placeholder replaced by the encoded share link.
pub const LINK_PLACEHOLDER: &str = "{link}";

/// Default whole-request timeout for resolver calls.
pub const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 120;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Decoded resolver body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverPayload {
    /// Body parsed as JSON (object, array, number, ...).
    Json(Value),
    /// Body that is not JSON, or a top-level JSON string.
    Text(String),
}

/// Result of one resolver call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveResponse {
    /// Always `true` once a body was received; usability is decided by the extractor.
    pub ok: bool,
    /// Decoded body.
    pub data: ResolverPayload,
    /// HTTP status of the resolver response.
    pub status_code: u16,
}

/// Calls the resolver API for share links.
pub struct LinkResolver {
    client: reqwest::Client,
    settings: Arc<dyn SettingsStore>,
    default_template: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LinkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkResolver")
            .field("default_template", &self.default_template)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LinkResolver {
    /// Creates a resolver that reads `api_template` from `settings` on every call.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        default_template: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        let client = build_http_client(&HttpClientOptions {
            name: "resolver",
            user_agent: user_agent::default_resolver_user_agent(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        })
        .map_err(ResolveError::client_build)?;

        Ok(Self {
            client,
            settings,
            default_template: default_template.into(),
            timeout: Some(Duration::from_secs(DEFAULT_RESOLVER_TIMEOUT_SECS)),
        })
    }

    /// Sets the whole-request timeout; `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves a share link.
    ///
    /// The template is read at call time so admin changes apply to the next
    /// request without a restart.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Settings`] when the template cannot be read
    /// - [`ResolveError::InvalidUrl`] when the rendered URL does not parse
    /// - [`ResolveError::Transport`] / [`ResolveError::Timeout`] for network faults
    #[instrument(skip(self, link), fields(link_len = link.len()))]
    pub async fn resolve(&self, link: &str) -> Result<ResolveResponse, ResolveError> {
        let template = self
            .settings
            .get(SettingKey::ApiTemplate)
            .await?
            .unwrap_or_else(|| self.default_template.clone());
        let request_url = render_request_url(&template, link);
        Url::parse(&request_url).map_err(|_| ResolveError::InvalidUrl {
            url: request_url.clone(),
        })?;
        info!(url = %request_url, "calling resolver");

        let mut builder = self.client.get(&request_url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ResolveError::from_reqwest(&request_url, e))?;
        let status_code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::from_reqwest(&request_url, e))?;

        let data = decode_payload(body);
        debug!(
            status = status_code,
            json = matches!(data, ResolverPayload::Json(_)),
            "resolver answered"
        );
        Ok(ResolveResponse {
            ok: true,
            data,
            status_code,
        })
    }
}

/// Substitutes the percent-encoded `link` for every `{link}` in `template`.
#[must_use]
pub fn render_request_url(template: &str, link: &str) -> String {
    template.replace(LINK_PLACEHOLDER, &urlencoding::encode(link))
}

/// JSON when the body parses as non-string JSON, text otherwise.
#[must_use]
pub fn decode_payload(body: String) -> ResolverPayload {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::String(text)) => ResolverPayload::Text(text),
        Ok(value) => ResolverPayload::Json(value),
        Err(_) => ResolverPayload::Text(body),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::db::Database;
    use crate::store::SqliteStore;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    async fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::new(Database::new_in_memory().await.unwrap()))
    }

    #[test]
    fn test_render_request_url_encodes_link() {
        let url = render_request_url(
            "https://api.example.com/?key=K&link={link}",
            "https://terabox.com/s/a b?x=1&y=2",
        );
        assert_eq!(
            url,
            "https://api.example.com/?key=K&link=https%3A%2F%2Fterabox.com%2Fs%2Fa%20b%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_render_request_url_without_placeholder_is_unchanged() {
        assert_eq!(
            render_request_url("https://api.example.com/fixed", "x"),
            "https://api.example.com/fixed"
        );
    }

    #[test]
    fn test_decode_payload_variants() {
        assert_eq!(
            decode_payload(r#"{"download":"https://d"}"#.to_string()),
            ResolverPayload::Json(json!({"download": "https://d"}))
        );
        assert_eq!(
            decode_payload("[1,2]".to_string()),
            ResolverPayload::Json(json!([1, 2]))
        );
        assert_eq!(
            decode_payload(r#""https://quoted""#.to_string()),
            ResolverPayload::Text("https://quoted".to_string())
        );
        assert_eq!(
            decode_payload("<html>oops</html>".to_string()),
            ResolverPayload::Text("<html>oops</html>".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_uses_stored_template_and_parses_json() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("link", "https://terabox.com/s/abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"download":"https://cdn/f.mp4"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let settings = store().await;
        settings
            .set(
                SettingKey::ApiTemplate,
                &format!("{}/api?link={{link}}", mock_server.uri()),
            )
            .await
            .unwrap();
        let resolver = LinkResolver::new(settings, "http://unused.invalid/?l={link}").unwrap();

        let response = resolver.resolve("https://terabox.com/s/abc").await.unwrap();
        assert!(response.ok);
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.data,
            ResolverPayload::Json(json!({"download": "https://cdn/f.mp4"}))
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_default_template_and_keeps_error_bodies() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/fallback"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let resolver = LinkResolver::new(
            store().await,
            format!("{}/fallback?link={{link}}", mock_server.uri()),
        )
        .unwrap();

        let response = resolver.resolve("https://terabox.com/s/x").await.unwrap();
        assert!(response.ok, "ok stays true for non-JSON bodies");
        assert_eq!(response.status_code, 502);
        assert_eq!(response.data, ResolverPayload::Text("bad gateway".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_times_out() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let resolver = LinkResolver::new(store().await, format!("{}/?l={{link}}", mock_server.uri()))
            .unwrap()
            .with_timeout(Some(Duration::from_millis(200)));

        let result = resolver.resolve("https://terabox.com/s/x").await;
        assert!(matches!(result, Err(ResolveError::Timeout { .. })), "{result:?}");
    }

    #[tokio::test]
    async fn test_resolve_invalid_template_url() {
        let resolver = LinkResolver::new(store().await, "not a url {link}").unwrap();
        let result = resolver.resolve("https://terabox.com/s/x").await;
        assert!(matches!(result, Err(ResolveError::InvalidUrl { .. })));
    }
}
