//! Error types and HTTP response conversion.
//!
//! Transient upstream failures degrade rather than raise inside the
//! metrics-gather path, while the actuator and provider client surface
//! them as hard errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// A non-2xx/202 response from the cloud provider's management API.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub status: u16,
    pub body: String,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider returned {}: {}", self.status, self.body)
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Rejected by the provider's management API (4xx on an update call).
    #[error("provider rejected request: {0}")]
    ProviderRejected(ProviderError),

    /// An asynchronous task returned a terminal failure status.
    #[error("task {task_id} failed with status {status}")]
    TaskFailed { task_id: String, status: String },

    /// Network-level failure talking to the provider or monitoring backend.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed JSON from an upstream service.
    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration failed to load.
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
            Error::TaskFailed { .. } => StatusCode::BAD_GATEWAY,
            Error::Transport(_) => StatusCode::BAD_GATEWAY,
            Error::Json(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: status.canonical_reason().unwrap_or("error").to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
