//! Access tokens for the management API.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::config::Credentials;
use super::TransportError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

/// Supplies bearer tokens, caching client-credentials grants until shortly
/// before they expire.
pub struct TokenSource {
    credentials: Credentials,
    token_url: String,
    http: reqwest::Client,
    cached: Arc<RwLock<Option<CachedToken>>>,
    refresh_margin: Duration,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Create a token source. `token_url` is ignored for static tokens.
    pub fn new(credentials: Credentials, token_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            http,
            cached: Arc::new(RwLock::new(None)),
            refresh_margin: Duration::seconds(30),
        }
    }

    /// A valid access token, refreshing it when needed.
    pub async fn token(&self) -> Result<String, TransportError> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::Worker {
                client_id,
                client_secret,
                ..
            } => (client_id, client_secret),
        };

        {
            let cache = self.cached.read().await;
            if let Some(token) = cache.as_ref().filter(|t| !t.is_expired(self.refresh_margin)) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cache = self.cached.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(token) = cache.as_ref().filter(|t| !t.is_expired(self.refresh_margin)) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.acquire(client_id, client_secret).await?;
        let access_token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(access_token)
    }

    #[instrument(skip_all, fields(token_url = %self.token_url))]
    async fn acquire(&self, client_id: &str, client_secret: &str) -> Result<CachedToken, TransportError> {
        debug!("Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| TransportError::Token(format!("token request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Token endpoint rejected the client credentials");
            return Err(TransportError::Token(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Token(format!("unreadable token response: {}", e.without_url())))?;

        let expires_at = Utc::now() + Duration::seconds(body.expires_in);
        debug!(expires_at = %expires_at.format("%Y-%m-%d %H:%M:%S UTC"), "Acquired access token");

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
