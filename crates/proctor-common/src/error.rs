//! Centralized error type for the proctoring core.
//!
//! Every HTTP-facing error flows through [`ProctorError`], which maps
//! deterministically to a status code and a stable machine-readable error
//! code. Internal failures are logged and never have their `Display` text
//! leaked to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ProctorError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Feature unavailable: {feature}")]
    Unavailable { feature: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    error: String,
    detail: String,
}

impl ProctorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unavailable { .. } => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ProctorError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            detail,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ProctorResult<T> = Result<T, ProctorError>;
