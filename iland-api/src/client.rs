//! Session object and authenticated request dispatch

use crate::auth::{Authenticator, Credentials, IssuedToken, Token, TokenStore};
use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.ilandcloud.com";
pub const DEFAULT_TOKEN_URL: &str =
    "https://console.ilandcloud.com/auth/realms/iland-core/protocol/openid-connect/token";
pub const DEFAULT_EVENT_URL: &str = "wss://api.ilandcloud.com/v1/event-websocket";

/// Versioned media type sent on every API call
pub const API_ACCEPT: &str = "application/vnd.ilandcloud.api.v1.0+json";

/// Sentinel the API prepends to JSON bodies to defeat script inclusion
pub const HIJACK_PREFIX: &[u8] = b")]}'";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host of the REST API, without trailing slash
    pub api_base: String,
    /// Identity provider endpoint for the password grant
    pub token_url: String,
    /// Identity provider endpoint for the refresh grant
    pub refresh_url: String,
    /// Event socket endpoint
    pub event_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Wait between task polls
    pub poll_interval: Duration,
    /// Wait before redialing the event socket
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            refresh_url: DEFAULT_TOKEN_URL.to_string(),
            event_url: DEFAULT_EVENT_URL.to_string(),
            timeout_secs: 120,
            poll_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Point both grants at one identity endpoint
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self.refresh_url = self.token_url.clone();
        self
    }

    pub fn with_refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = url.into();
        self
    }

    pub fn with_event_url(mut self, url: impl Into<String>) -> Self {
        self.event_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn validate(&self) -> ApiResult<()> {
        for (name, value, schemes) in [
            ("api_base", &self.api_base, &["http", "https"][..]),
            ("token_url", &self.token_url, &["http", "https"][..]),
            ("refresh_url", &self.refresh_url, &["http", "https"][..]),
            ("event_url", &self.event_url, &["ws", "wss"][..]),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| ApiError::InvalidConfig(format!("{name} '{value}': {e}")))?;
            if !schemes.contains(&parsed.scheme()) {
                return Err(ApiError::InvalidConfig(format!(
                    "{name} '{value}' must use one of {schemes:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Successful response payload with the hijack prefix already removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body(Bytes);

impl Body {
    pub fn from_payload(payload: Bytes) -> Self {
        if payload.starts_with(HIJACK_PREFIX) {
            Body(payload.slice(HIJACK_PREFIX.len()..))
        } else {
            Body(payload)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_slice(&self.0)?)
    }
}

struct Shared {
    config: ClientConfig,
    auth: Authenticator,
    tokens: TokenStore,
}

/// An authenticated session against the console API.
///
/// Cloning is cheap; every clone shares the same token and connection pool,
/// so one `Client` can serve any number of concurrent tasks.
#[derive(Clone)]
pub struct Client {
    pub(crate) http_client: reqwest::Client,
    shared: Arc<Shared>,
}

impl Client {
    /// Create a session. No network traffic happens until the first call.
    pub fn new(credentials: Credentials, config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let auth = Authenticator::new(
            http_client.clone(),
            config.token_url.clone(),
            config.refresh_url.clone(),
            credentials,
        );

        Ok(Self {
            http_client,
            shared: Arc::new(Shared {
                config,
                auth,
                tokens: TokenStore::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn credentials(&self) -> &Credentials {
        self.shared.auth.credentials()
    }

    /// Seed the session with a token obtained elsewhere
    pub async fn set_token(&self, token: Token) {
        self.shared
            .tokens
            .replace(Some(IssuedToken::issue(token, Utc::now())))
            .await;
    }

    /// Forget the current token; the next call logs in again
    pub async fn clear_token(&self) {
        self.shared.tokens.replace(None).await;
    }

    pub async fn current_token(&self) -> Option<IssuedToken> {
        self.shared.tokens.current().await
    }

    /// Return an access token that is valid now, acquiring or renewing first
    /// when needed. Concurrent callers queue on the token lock, so at most one
    /// renewal is in flight.
    pub async fn ensure_token(&self) -> ApiResult<String> {
        let mut slot = self.shared.tokens.lock().await;
        self.shared.auth.ensure_fresh(&mut slot).await?;
        slot.as_ref()
            .map(|issued| issued.token.access_token.clone())
            .ok_or_else(|| ApiError::Authentication("no token after login".to_string()))
    }

    pub(crate) fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.shared.config.api_base, path)
    }

    /// Perform one authenticated call and return the response payload
    pub async fn call(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> ApiResult<Body> {
        let token = self.ensure_token().await?;
        let url = self.build_url(path);

        tracing::debug!(target: "api::request", method = %method, path = %path, "Dispatching request");

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, API_ACCEPT);
        if method == Method::POST || method == Method::PUT {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.unwrap_or_default());
        } else if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() > 204 {
            let message = match response.text().await {
                Ok(text) => text,
                Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
            };
            tracing::warn!(
                target: "api::request",
                method = %method,
                path = %path,
                status = status.as_u16(),
                "Request failed"
            );
            return Err(ApiError::Request {
                status: status.as_u16(),
                message,
            });
        }

        let payload = response.bytes().await?;
        tracing::trace!(target: "api::request", path = %path, bytes = payload.len(), "Request succeeded");
        Ok(Body::from_payload(payload))
    }

    pub async fn get(&self, path: &str) -> ApiResult<Body> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> ApiResult<Body> {
        self.call(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> ApiResult<Body> {
        self.call(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Body> {
        self.call(Method::DELETE, path, None).await
    }

    /// GET and decode the JSON payload
    pub async fn get_object<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.get(path).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, serde_json::to_vec(payload)?).await?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.put(path, serde_json::to_vec(payload)?).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_strips_hijack_prefix() {
        let prefixed = Body::from_payload(Bytes::from_static(b")]}'{\"uuid\":\"x\"}"));
        let plain = Body::from_payload(Bytes::from_static(b"{\"uuid\":\"x\"}"));

        assert_eq!(prefixed, plain);
        let value: serde_json::Value = prefixed.json().unwrap();
        assert_eq!(value, serde_json::json!({"uuid": "x"}));
    }

    #[test]
    fn body_keeps_prefix_like_text_elsewhere() {
        let body = Body::from_payload(Bytes::from_static(b"\"a)]}'\""));
        assert_eq!(body.text(), "\"a)]}'\"");
    }

    #[test]
    fn config_builder_trims_base_and_shares_token_url() {
        let config = ClientConfig::new()
            .with_api_base("http://localhost:8080/")
            .with_token_url("http://localhost:9090/token");

        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.refresh_url, "http://localhost:9090/token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_http_event_url() {
        let config = ClientConfig::new().with_event_url("https://api.example.com/events");
        assert!(matches!(config.validate(), Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn defaults_point_at_public_endpoints() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }
}
