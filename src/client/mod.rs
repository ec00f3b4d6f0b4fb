//! PingOne management API client.
//!
//! [`PingOneClient`] is built once at configure time and shared by every
//! handler through a [`RequestContext`]. Calls go through
//! [`executor::execute`], which owns retries and error classification.

pub mod api_error;
pub mod auth;
pub mod config;
pub mod executor;
pub mod retry;

pub use api_error::{ApiError, ApiErrorDetail, InnerError};
pub use auth::TokenSource;
pub use config::{Credentials, GlobalOptions, ProviderConfig, Region};
pub use executor::{execute, ApiCall, ApiFailure, DefaultClassifier, ErrorClassifier, InvalidValue, NotFoundWarning};
pub use retry::{DefaultCreateRead, RetryPolicy, Retryable, RoleAssignment};

use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::ProviderError;

/// A request that produced no HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, or timeout failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The token endpoint could not issue a token.
    #[error("Unable to obtain access token: {0}")]
    Token(String),
}

/// The parts of an HTTP response the executor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed `Retry-After` header.
    pub retry_after: Option<Duration>,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    async fn read(response: reqwest::Response) -> Result<Self, TransportError> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(retry::parse_retry_after);
        let body = response.text().await?;
        Ok(Self {
            status,
            retry_after,
            body,
        })
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A configured connection to the management API.
#[derive(Debug)]
pub struct PingOneClient {
    http: reqwest::Client,
    api_base: String,
    tokens: TokenSource,
    retry: RetryPolicy,
    global_options: GlobalOptions,
}

impl PingOneClient {
    /// Build a client from a resolved configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let credentials = config.credentials()?;
        let token_url = match &credentials {
            Credentials::Worker { environment_id, .. } => config.token_url(environment_id),
            Credentials::AccessToken(_) => String::new(),
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("pingone-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            tokens: TokenSource::new(credentials, token_url, http.clone()),
            http,
            api_base: config.api_base_url(),
            retry: RetryPolicy::default().with_additional_retry_codes(config.additional_retry_codes.iter().copied()),
            global_options: config.global_options.clone(),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The management API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Cross-resource behavior switches.
    pub fn global_options(&self) -> &GlobalOptions {
        &self.global_options
    }

    /// The token source.
    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }

    /// Absolute URL of an API path such as `/environments/{id}/groups`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send one authenticated request.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, TransportError> {
        let token = self.tokens.token().await?;
        debug!(%method, path, "Sending request");

        let mut request = self.http.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        RawResponse::read(request.send().await?).await
    }

    /// Whether the environment exists, or `None` when the probe itself fails.
    pub async fn environment_exists(&self, environment_id: &str) -> Option<bool> {
        let path = format!("/environments/{}", environment_id);
        match self.send(Method::GET, &path, None).await {
            Ok(response) if response.status == 404 => Some(false),
            Ok(response) if response.is_success() => Some(true),
            _ => None,
        }
    }
}

/// Per-operation context handed to every handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    client: Arc<PingOneClient>,
    deadline: tokio::time::Instant,
    environment_id: Option<String>,
}

impl RequestContext {
    /// Deadline applied when the engine sets none.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

    /// A context whose deadline is [`Self::DEFAULT_TIMEOUT`] from now.
    pub fn new(client: Arc<PingOneClient>) -> Self {
        Self::with_timeout(client, Self::DEFAULT_TIMEOUT)
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(client: Arc<PingOneClient>, timeout: Duration) -> Self {
        Self {
            client,
            deadline: tokio::time::Instant::now() + timeout,
            environment_id: None,
        }
    }

    /// The same context, attaching an environment for the permission probe.
    #[must_use]
    pub fn for_environment(&self, environment_id: impl Into<String>) -> Self {
        Self {
            environment_id: Some(environment_id.into()),
            ..self.clone()
        }
    }

    /// The shared client.
    pub fn client(&self) -> &PingOneClient {
        &self.client
    }

    /// When retries stop.
    pub fn deadline(&self) -> tokio::time::Instant {
        self.deadline
    }

    /// The environment the operation acts in, if attached.
    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    /// Cross-resource behavior switches.
    pub fn global_options(&self) -> &GlobalOptions {
        self.client.global_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_config() -> ProviderConfig {
        ProviderConfig {
            access_token: Some("token".to_string()),
            region: Some(Region::Europe),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_urls() {
        let client = PingOneClient::new(&token_config()).unwrap();
        assert_eq!(client.api_base(), "https://api.pingone.eu/v1");
        assert_eq!(
            client.url("/environments/e/groups"),
            "https://api.pingone.eu/v1/environments/e/groups"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let err = PingOneClient::new(&ProviderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Missing credentials"));
    }

    #[test]
    fn test_additional_retry_codes_reach_policy() {
        let config = ProviderConfig {
            additional_retry_codes: vec![409],
            ..token_config()
        };
        let client = PingOneClient::new(&config).unwrap();
        assert_eq!(client.retry_policy().additional_retry_codes, vec![409]);
    }

    #[tokio::test]
    async fn test_request_context() {
        let client = Arc::new(PingOneClient::new(&token_config()).unwrap());
        let ctx = RequestContext::with_timeout(client, Duration::from_secs(5));
        assert!(ctx.environment_id().is_none());

        let scoped = ctx.for_environment("env-1");
        assert_eq!(scoped.environment_id(), Some("env-1"));
        assert_eq!(scoped.deadline(), ctx.deadline());
        assert!(!scoped.global_options().population.contains_users_force_delete);
    }
}
