//! Dispatch error types

use parley_foundation::Error as FoundationError;
use parley_provider::ProviderError;
use thiserror::Error;

/// Errors returned by trigger / schedule
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Malformed request (blank ids, delay out of range)
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// No adapter answers the contact
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Push collaborator reported failure
    #[error("Push delivery failed: {0}")]
    Push(String),

    /// Token or job store failed
    #[error("Store error: {0}")]
    Store(String),
}

impl From<FoundationError> for DispatchError {
    fn from(err: FoundationError) -> Self {
        if err.is_user_facing() {
            DispatchError::Invalid(err.to_string())
        } else {
            DispatchError::Store(err.to_string())
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Push(err.to_string())
    }
}
