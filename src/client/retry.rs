//! Retry policy and retry conditions for API calls.
//!
//! Transient failures (network errors, throttling, gateway errors) are always
//! retried within [`RetryPolicy::max_attempts`]. Conditions that depend on the
//! operation, such as a parent object not being visible yet, are supplied by
//! the caller as a [`Retryable`].

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use rand::Rng;

use super::executor::ApiFailure;

static PERMISSION_PROPAGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^The actor attempting to perform the request is not authorized\.")
        .expect("PERMISSION_PROPAGATION is a valid regex pattern")
});

static ROLE_SCOPE_PROPAGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Must have role at the same or broader scope")
        .expect("ROLE_SCOPE_PROPAGATION is a valid regex pattern")
});

const TRANSIENT_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Backoff and budget settings for API calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Retries spent on not-found responses while a new object propagates.
    pub max_not_found_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for a single sleep.
    pub max_delay: Duration,
    /// Random extra delay as a fraction of the computed delay.
    pub jitter_factor: f64,
    /// Status codes retried in addition to the transient set.
    pub additional_retry_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            max_not_found_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.25,
            additional_retry_codes: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// A policy with millisecond delays for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 5,
            max_not_found_retries: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            jitter_factor: 0.0,
            additional_retry_codes: Vec::new(),
        }
    }

    /// Retry these status codes as well.
    #[must_use]
    pub fn with_additional_retry_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.additional_retry_codes.extend(codes);
        self
    }

    /// Whether `failure` is retried regardless of the operation.
    pub fn is_transient(&self, failure: &ApiFailure) -> bool {
        match failure.status {
            None => failure.is_network(),
            Some(status) => TRANSIENT_STATUS.contains(&status) || self.additional_retry_codes.contains(&status),
        }
    }

    /// Delay before retry number `retry` (zero-based).
    ///
    /// A server-provided `Retry-After` wins over the computed delay; both are
    /// capped at [`RetryPolicy::max_delay`].
    pub fn backoff(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let delay = match retry_after {
            Some(after) => after.min(self.max_delay),
            None => {
                let factor = 2_u32.saturating_pow(retry.min(16));
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            },
        };
        self.add_jitter(delay)
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let delay_ms = delay.as_millis() as f64;
        let jitter = rand::thread_rng().gen_range(0.0..=delay_ms * self.jitter_factor);
        Duration::from_millis((delay_ms + jitter) as u64)
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// An operation-specific retry condition.
pub trait Retryable: Send + Sync {
    /// Whether another attempt may succeed.
    fn should_retry(&self, failure: &ApiFailure) -> bool;
}

/// Retries used by Create and Read.
///
/// A freshly created parent may answer not-found for a short while, and
/// newly granted permissions take time to apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCreateRead;

impl Retryable for DefaultCreateRead {
    fn should_retry(&self, failure: &ApiFailure) -> bool {
        if failure.is_not_found() {
            return true;
        }
        failure
            .error
            .as_ref()
            .is_some_and(|e| PERMISSION_PROPAGATION.is_match(&e.message))
    }
}

/// [`DefaultCreateRead`] plus the role scope propagation message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAssignment;

impl Retryable for RoleAssignment {
    fn should_retry(&self, failure: &ApiFailure) -> bool {
        if DefaultCreateRead.should_retry(failure) {
            return true;
        }
        failure
            .error
            .as_ref()
            .and_then(|e| e.first_detail())
            .and_then(|d| d.message.as_deref())
            .is_some_and(|m| ROLE_SCOPE_PROPAGATION.is_match(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api_error::{ApiError, ApiErrorDetail};

    fn api_failure(status: u16, code: &str, message: &str) -> ApiFailure {
        ApiFailure::http(
            status,
            String::new(),
            Some(ApiError {
                id: "e-1".to_string(),
                code: code.to_string(),
                message: message.to_string(),
                details: Vec::new(),
            }),
            None,
        )
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.max_not_found_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_transient_statuses() {
        let policy = RetryPolicy::default().with_additional_retry_codes([409]);
        assert!(policy.is_transient(&ApiFailure::http(503, String::new(), None, None)));
        assert!(policy.is_transient(&ApiFailure::http(429, String::new(), None, None)));
        assert!(policy.is_transient(&ApiFailure::http(409, String::new(), None, None)));
        assert!(!policy.is_transient(&ApiFailure::http(404, String::new(), None, None)));
        assert!(!policy.is_transient(&ApiFailure::http(400, String::new(), None, None)));
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(0, None), Duration::from_millis(500));
        assert_eq!(policy.backoff(1, None), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3, None), Duration::from_millis(4000));
        assert_eq!(policy.backoff(12, None), Duration::from_secs(30));
        assert_eq!(policy.backoff(40, None), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_honours_retry_after() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(0, Some(Duration::from_secs(2))), Duration::from_secs(2));
        assert_eq!(policy.backoff(0, Some(Duration::from_secs(120))), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::default();
        for _ in 0..20 {
            let delay = policy.backoff(0, None);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(625));
        }
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_default_create_read() {
        assert!(DefaultCreateRead.should_retry(&ApiFailure::http(404, String::new(), None, None)));
        assert!(DefaultCreateRead.should_retry(&api_failure(400, "NOT_FOUND", "gone")));
        assert!(DefaultCreateRead.should_retry(&api_failure(
            403,
            "ACCESS_FAILED",
            "The actor attempting to perform the request is not authorized."
        )));
        assert!(!DefaultCreateRead.should_retry(&api_failure(400, "INVALID_DATA", "bad")));
    }

    #[test]
    fn test_role_assignment() {
        let mut failure = api_failure(400, "INVALID_DATA", "bad");
        if let Some(error) = failure.error.as_mut() {
            error.details.push(ApiErrorDetail {
                message: Some("Must have role at the same or broader scope as the assigned role".to_string()),
                ..ApiErrorDetail::default()
            });
        }
        assert!(RoleAssignment.should_retry(&failure));
        assert!(!DefaultCreateRead.should_retry(&failure));
    }
}
