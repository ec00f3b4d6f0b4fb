//! Error types for protocol-level provider faults.
//!
//! Domain failures (API errors, validation problems, drift) travel as
//! [`Diagnostics`](crate::diagnostics::Diagnostics) alongside state. A
//! [`ProviderError`] is reserved for calls the provider cannot service at all.

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Errors that can occur when servicing a provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred, or the provider has not been configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The requested data source type is unknown.
    #[error("Unknown data source type: {0}")]
    UnknownDataSource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An HTTP transport error occurred while building or using the client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::UnknownDataSource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::DeadlineExceeded(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Shorthand for the error returned when a lifecycle call arrives before `configure`.
    pub fn not_configured() -> Self {
        Self::Configuration("provider not configured".to_string())
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let summary = match &err {
            ProviderError::Configuration(_) => "Provider configuration error",
            ProviderError::Validation(_) | ProviderError::InvalidRequest(_) => "Invalid request",
            ProviderError::UnknownResource(_) | ProviderError::UnknownDataSource(_) => {
                "Unknown type"
            },
            _ => "Unexpected provider error",
        };
        Diagnostic::error(summary).with_detail(err.to_string())
    }
}
