//! Retrying API call execution and error classification.
//!
//! Every API call made by a handler goes through [`execute`]:
//!
//! ```text
//! Dispatched -> Success
//!            -> Retry -> Dispatched
//!            -> Classified -> Warn | Err | OkNull
//! ```
//!
//! Failures end up as [`Diagnostics`]; the payload is `None` whenever the call
//! did not succeed.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, warn};

use super::api_error::ApiError;
use super::retry::Retryable;
use super::{RawResponse, RequestContext, TransportError};
use crate::diagnostics::{Diagnostic, Diagnostics};

/// Summary of the warning emitted when a read or delete finds nothing.
pub const RESOURCE_NOT_FOUND: &str = "Requested resource not found";

const RESOURCE_NOT_FOUND_DETAIL: &str = "The requested resource configuration cannot be found in the PingOne service.  If the requested resource is managed in Terraform's state, it may have been removed outside of Terraform.";

/// A failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// HTTP status, absent for network failures.
    pub status: Option<u16>,
    /// Raw response body.
    pub body: String,
    /// The PingOne error body, when the response carried one.
    pub error: Option<ApiError>,
    /// Server-requested delay.
    pub retry_after: Option<Duration>,
    network: Option<String>,
}

impl ApiFailure {
    /// A failure with an HTTP response.
    pub fn http(status: u16, body: String, error: Option<ApiError>, retry_after: Option<Duration>) -> Self {
        Self {
            status: Some(status),
            body,
            error,
            retry_after,
            network: None,
        }
    }

    /// A failure without a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: String::new(),
            error: None,
            retry_after: None,
            network: Some(message.into()),
        }
    }

    fn from_response(response: RawResponse) -> Self {
        let error = ApiError::parse(&response.body);
        Self::http(response.status, response.body, error, response.retry_after)
    }

    /// Whether no response was received.
    pub fn is_network(&self) -> bool {
        self.network.is_some()
    }

    /// Whether the server reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || self.error.as_ref().is_some_and(ApiError::is_not_found)
    }

    /// Whether the status suggests missing permissions.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.status, Some(400 | 401 | 403))
    }

    /// Target of the first error detail.
    pub fn first_detail_target(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(ApiError::first_detail)
            .and_then(|d| d.target.as_deref())
    }

    /// The most specific message available.
    pub fn message(&self) -> String {
        if let Some(error) = &self.error {
            return error.message.clone();
        }
        if let Some(network) = &self.network {
            return network.clone();
        }
        self.status
            .map(|s| {
                reqwest::StatusCode::from_u16(s)
                    .map(|code| code.to_string())
                    .unwrap_or_else(|_| s.to_string())
            })
            .unwrap_or_default()
    }
}

/// Turns a final failure into diagnostics before default classification.
///
/// Returning `None` falls through to the default rendering.
pub trait ErrorClassifier: Send + Sync {
    /// Classify `failure` raised by `operation`.
    fn classify(&self, operation: &str, failure: &ApiFailure) -> Option<Diagnostics>;
}

/// Leaves every failure to the default rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, _operation: &str, _failure: &ApiFailure) -> Option<Diagnostics> {
        None
    }
}

/// Downgrades not-found to a warning with a null payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundWarning;

impl ErrorClassifier for NotFoundWarning {
    fn classify(&self, _operation: &str, failure: &ApiFailure) -> Option<Diagnostics> {
        failure
            .is_not_found()
            .then(|| Diagnostics::from(Diagnostic::warning(RESOURCE_NOT_FOUND).with_detail(RESOURCE_NOT_FOUND_DETAIL)))
    }
}

/// Reports a rejected `name` value as "Invalid Value".
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidValue;

impl ErrorClassifier for InvalidValue {
    fn classify(&self, _operation: &str, failure: &ApiFailure) -> Option<Diagnostics> {
        let detail = failure.error.as_ref()?.first_detail()?;
        if detail.code.as_deref() == Some("INVALID_VALUE") && detail.target.as_deref() == Some("name") {
            let diagnostic = Diagnostic::error("Invalid Value")
                .with_detail(detail.message.clone().unwrap_or_default())
                .with_attribute("name");
            return Some(Diagnostics::from(diagnostic));
        }
        None
    }
}

/// Run `api_call` until it succeeds, the failure is final, or the deadline passes.
pub async fn execute<T, F, Fut>(
    ctx: &RequestContext,
    operation: &str,
    mut api_call: F,
    classifier: &dyn ErrorClassifier,
    retryable: Option<&dyn Retryable>,
) -> (Option<T>, Diagnostics)
where
    T: DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, TransportError>>,
{
    let policy = ctx.client().retry_policy();
    let deadline = ctx.deadline();
    let mut attempt: u32 = 0;
    let mut not_found_retries: u32 = 0;
    let mut token_refreshed = false;

    loop {
        attempt += 1;
        debug!(operation, attempt, "Dispatching API call");

        let outcome = match timeout_at(deadline, api_call()).await {
            Ok(outcome) => outcome,
            Err(_) => return (None, deadline_exceeded(operation)),
        };

        let failure = match outcome {
            Ok(response) if response.is_success() => return decode(operation, &response.body),
            Ok(response) => ApiFailure::from_response(response),
            Err(TransportError::Token(message)) => {
                let diagnostic = Diagnostic::error("Unable to obtain access token")
                    .with_detail(format!("Calling `{}` requires an access token: {}", operation, message));
                return (None, Diagnostics::from(diagnostic));
            },
            Err(TransportError::Http(e)) => ApiFailure::network(e.without_url().to_string()),
        };

        if failure.status == Some(401) && !token_refreshed {
            token_refreshed = true;
            debug!(operation, "Access token rejected, refreshing");
            ctx.client().tokens().invalidate().await;
            continue;
        }

        let retry = if policy.is_transient(&failure) {
            attempt < policy.max_attempts
        } else if retryable.is_some_and(|r| r.should_retry(&failure)) {
            if failure.is_not_found() {
                not_found_retries += 1;
                not_found_retries <= policy.max_not_found_retries
            } else {
                attempt < policy.max_attempts
            }
        } else {
            false
        };

        if retry {
            let delay = policy.backoff(attempt - 1, failure.retry_after);
            warn!(
                operation,
                attempt,
                status = ?failure.status,
                delay_ms = whole_millis(delay),
                "Retrying API call"
            );
            if Instant::now() + delay >= deadline {
                return (None, deadline_exceeded(operation));
            }
            sleep(delay).await;
            continue;
        }

        let failure = reclassify_missing_environment(ctx, operation, failure).await;
        return (None, classify(operation, &failure, classifier));
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn whole_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

async fn reclassify_missing_environment(ctx: &RequestContext, operation: &str, failure: ApiFailure) -> ApiFailure {
    let Some(environment_id) = ctx.environment_id() else {
        return failure;
    };
    if !failure.is_permission_denied() {
        return failure;
    }

    let probe = timeout_at(ctx.deadline(), ctx.client().environment_exists(environment_id)).await;
    if !matches!(probe, Ok(Some(false))) {
        return failure;
    }

    warn!(operation, environment_id, "Environment no longer exists, treating failure as not found");
    let message = format!("The environment {} does not exist", environment_id);
    ApiFailure::http(
        404,
        failure.body,
        Some(ApiError {
            id: failure.error.map(|e| e.id).unwrap_or_default(),
            code: "NOT_FOUND".to_string(),
            message,
            details: Vec::new(),
        }),
        None,
    )
}

/// Render a final failure.
pub fn classify(operation: &str, failure: &ApiFailure, classifier: &dyn ErrorClassifier) -> Diagnostics {
    if let Some(diagnostics) = classifier.classify(operation, failure) {
        return diagnostics;
    }

    let summary = format!("Error when calling `{}`: {}", operation, failure.message());
    let diagnostic = match (&failure.error, failure.status) {
        (Some(error), _) => Diagnostic::error(summary).with_detail(error.render_detail()),
        (None, Some(_)) if !failure.body.is_empty() => {
            error!(operation, "API returned an unrecognised error body");
            Diagnostic::error(summary).with_detail(failure.body.clone())
        },
        _ => Diagnostic::error(summary),
    };
    Diagnostics::from(diagnostic)
}

fn decode<T: DeserializeOwned>(operation: &str, body: &str) -> (Option<T>, Diagnostics) {
    let text = if body.trim().is_empty() { "null" } else { body };
    match serde_json::from_str::<T>(text) {
        Ok(payload) => (Some(payload), Diagnostics::new()),
        Err(e) => {
            error!(operation, error = %e, "Unable to parse API response");
            let diagnostic = Diagnostic::error("Unexpected API response")
                .with_detail(format!("The response of `{}` could not be read: {}", operation, e));
            (None, Diagnostics::from(diagnostic))
        },
    }
}

fn deadline_exceeded(operation: &str) -> Diagnostics {
    Diagnostics::from(
        Diagnostic::error("Operation deadline exceeded")
            .with_detail(format!("`{}` did not complete before the operation deadline.", operation)),
    )
}

/// A request description executed through [`execute`].
pub struct ApiCall<'a> {
    operation: String,
    method: Method,
    path: String,
    body: Option<Value>,
    classifier: &'a dyn ErrorClassifier,
    retryable: Option<&'a dyn Retryable>,
}

impl<'a> ApiCall<'a> {
    /// A call named `operation`.
    pub fn new(method: Method, operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            method,
            path: path.into(),
            body: None,
            classifier: &DefaultClassifier,
            retryable: None,
        }
    }

    /// A `GET` call.
    pub fn get(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::GET, operation, path)
    }

    /// A `POST` call.
    pub fn post(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::POST, operation, path)
    }

    /// A `PUT` call.
    pub fn put(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, operation, path)
    }

    /// A `PATCH` call.
    pub fn patch(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, operation, path)
    }

    /// A `DELETE` call.
    pub fn delete(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, operation, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Use `classifier` for final failures.
    #[must_use]
    pub fn with_classifier(mut self, classifier: &'a dyn ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Retry failures accepted by `retryable`.
    #[must_use]
    pub fn with_retryable(mut self, retryable: &'a dyn Retryable) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Execute and decode the payload.
    pub async fn send<T: DeserializeOwned>(self, ctx: &RequestContext) -> (Option<T>, Diagnostics) {
        let client = ctx.client();
        let method = self.method;
        let path = self.path.as_str();
        let body = self.body.as_ref();
        execute(
            ctx,
            &self.operation,
            move || client.send(method.clone(), path, body),
            self.classifier,
            self.retryable,
        )
        .await
    }
}
