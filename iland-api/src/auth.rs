//! Credentials, bearer tokens and their renewal

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{Mutex, MutexGuard};

/// Seconds shaved off the reported ttl so a token is renewed before the
/// identity provider rejects it.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Login material for the password grant. Immutable for the life of a client.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    client_secret: String,
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair as issued by the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Time to live in seconds
    #[serde(default)]
    pub expires_in: i64,
}

/// A token together with the instant it must be renewed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: Token,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Stamp a freshly received token with its renewal instant
    pub fn issue(token: Token, acquired_at: DateTime<Utc>) -> Self {
        let ttl = token.expires_in.saturating_sub(EXPIRY_MARGIN_SECS);
        // out-of-range ttls clamp to the nearest representable instant
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|ttl| acquired_at.checked_add_signed(ttl))
            .unwrap_or(if ttl < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });
        Self { token, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Slot holding the session's current token. Either empty or a complete
/// [`IssuedToken`]; always replaced wholesale.
#[derive(Debug, Default)]
pub struct TokenStore {
    slot: Mutex<Option<IssuedToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot. Holding the guard serializes check-renew-read sequences.
    pub async fn lock(&self) -> MutexGuard<'_, Option<IssuedToken>> {
        self.slot.lock().await
    }

    /// Snapshot of the current token
    pub async fn current(&self) -> Option<IssuedToken> {
        self.slot.lock().await.clone()
    }

    pub async fn replace(&self, token: Option<IssuedToken>) {
        *self.slot.lock().await = token;
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
    grant_type: &'static str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
}

/// Exchanges credentials for tokens against the identity provider
pub struct Authenticator {
    http_client: reqwest::Client,
    token_url: String,
    refresh_url: String,
    credentials: Credentials,
}

impl Authenticator {
    pub fn new(
        http_client: reqwest::Client,
        token_url: impl Into<String>,
        refresh_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http_client,
            token_url: token_url.into(),
            refresh_url: refresh_url.into(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Password grant. Replaces whatever the slot held.
    pub async fn acquire(&self, slot: &mut Option<IssuedToken>) -> ApiResult<()> {
        tracing::debug!(target: "api::auth", username = %self.credentials.username, "Requesting access token");

        let form = PasswordGrant {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            username: &self.credentials.username,
            password: &self.credentials.password,
            grant_type: "password",
        };

        let issued = self
            .exchange(&self.token_url, &form, "could not retrieve a token")
            .await?;
        *slot = Some(issued);

        tracing::info!(target: "api::auth", "Access token acquired");
        Ok(())
    }

    /// Refresh grant using the slot's refresh token
    pub async fn refresh(&self, slot: &mut Option<IssuedToken>) -> ApiResult<()> {
        let refresh_token = match slot.as_ref() {
            Some(issued) if !issued.token.refresh_token.is_empty() => {
                issued.token.refresh_token.clone()
            }
            _ => {
                return Err(ApiError::Authentication(
                    "no refresh token available".to_string(),
                ))
            }
        };

        tracing::debug!(target: "api::auth", "Refreshing access token");

        let form = RefreshGrant {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            refresh_token: &refresh_token,
            grant_type: "refresh_token",
        };

        let issued = self
            .exchange(&self.refresh_url, &form, "could not refresh the current token")
            .await?;
        *slot = Some(issued);

        tracing::info!(target: "api::auth", "Access token refreshed");
        Ok(())
    }

    /// Make the slot hold a usable token: acquire when empty, renew when stale.
    /// A failed refresh falls back to a full login.
    pub async fn ensure_fresh(&self, slot: &mut Option<IssuedToken>) -> ApiResult<()> {
        let expired = match slot.as_ref() {
            None => return self.acquire(slot).await,
            Some(issued) => issued.is_expired(Utc::now()),
        };
        if !expired {
            return Ok(());
        }

        if let Err(e) = self.refresh(slot).await {
            tracing::warn!(target: "api::auth", error = %e, "Token refresh failed, logging in again");
            self.acquire(slot).await?;
        }
        Ok(())
    }

    async fn exchange<F: Serialize>(
        &self,
        url: &str,
        form: &F,
        failure: &str,
    ) -> ApiResult<IssuedToken> {
        let response = self
            .http_client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| ApiError::Authentication(format!("{failure}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(target: "api::auth", status = status.as_u16(), "Identity provider rejected grant");
            return Err(ApiError::Authentication(failure.to_string()));
        }

        let token: Token = response
            .json()
            .await
            .map_err(|e| ApiError::Authentication(format!("{failure}: {e}")))?;
        if token.access_token.is_empty() {
            return Err(ApiError::Authentication(format!(
                "{failure}: empty access token"
            )));
        }

        Ok(IssuedToken::issue(token, Utc::now()))
    }
}
