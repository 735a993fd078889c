//! Provider-specific error types
//!
//! Every variant is scoped to one in-flight stream. Once streaming has begun
//! the SSE encoder turns the error into a single terminal `error` event.

use parley_foundation::{Error as FoundationError, ProviderKind};
use parley_task::CliError;
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// No adapter registered for the kind
    #[error("Provider kind not registered: {0}")]
    Unregistered(ProviderKind),

    /// Contact is missing settings the adapter needs
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Local command failed; carries the wrapper's message unchanged
    #[error("{0}")]
    Cli(String),

    /// Non-success HTTP response; body kept verbatim
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from the provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Streaming error
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        ProviderError::Http {
            status,
            body: body.into(),
        }
    }

    /// Whether the failure happened before the caller could reach a provider
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::Unregistered(_) | ProviderError::NotConfigured(_)
        )
    }
}

impl From<CliError> for ProviderError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::MissingCommand | CliError::InvalidConfig(_) => {
                ProviderError::NotConfigured(err.to_string())
            }
            other => ProviderError::Cli(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

// ============================================================================
// parley_foundation::Error conversion
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unregistered(kind) => {
                FoundationError::UnknownProviderKind(kind.to_string())
            }
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            other => FoundationError::Internal(other.to_string()),
        }
    }
}
