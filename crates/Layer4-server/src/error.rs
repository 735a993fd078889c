//! HTTP error mapping
//!
//! Every failure leaves a handler as `{"error": "..."}` with a status code
//! chosen by where it came from.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_dispatch::DispatchError;
use parley_foundation::Error as FoundationError;
use parley_provider::ProviderError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed body, failed validation or unknown provider kind
    #[error("{0}")]
    BadRequest(String),

    /// Provider or push delivery failed
    #[error("{0}")]
    Upstream(String),

    /// Store failure
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<FoundationError> for AppError {
    fn from(err: FoundationError) -> Self {
        if err.is_user_facing() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        if err.is_configuration() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Invalid(msg) => AppError::BadRequest(msg),
            DispatchError::Provider(e) => e.into(),
            DispatchError::Push(msg) => AppError::Upstream(format!("Push delivery failed: {}", msg)),
            DispatchError::Store(msg) => AppError::Internal(msg),
        }
    }
}
