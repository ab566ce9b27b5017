//! Error types for the gateway binary and its HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use agentic_trust::TrustError;

/// Startup and configuration failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("trust engine error: {0}")]
    Trust(#[from] TrustError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ServerError {
    fn from(e: toml::de::Error) -> Self {
        ServerError::Config(format!("TOML parse error: {}", e))
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

/// A failed request, rendered as `{error, errorCode, statusCode}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("index has not completed its initial sync")]
    NotReady,

    #[error("{0}")]
    Trust(#[from] TrustError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Trust(e) => match e {
                TrustError::NotFound(_) => StatusCode::NOT_FOUND,
                TrustError::InvalidChallenge(_) => StatusCode::BAD_REQUEST,
                TrustError::ChallengeCapacity(_) => StatusCode::SERVICE_UNAVAILABLE,
                e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "INVALID_STRUCTURE",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            ApiError::Trust(e) if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.public_message(),
            "errorCode": self.code(),
            "statusCode": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
