//! Error handling for the Shop Stock Assistant backend
//!
//! One taxonomy covers both halves of the system: upstream API failures
//! (classified by the fetch layer so the frontend can tell "re-enter your
//! token" apart from "try again later") and synchronous validation failures
//! on uploaded sheets.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::reconcile::FormatError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Upstream marketplace / warehouse API errors
    #[error("credential rejected by the remote API")]
    Unauthorized,

    #[error("remote API rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("remote API unavailable: {0}")]
    MarketplaceUnavailable(String),

    #[error("unexpected remote API response: {0}")]
    MalformedResponse(String),

    // Upload / reconciliation errors
    #[error(transparent)]
    UnrecognizedFormat(#[from] FormatError),

    #[error("could not read file as a spreadsheet or delimited text")]
    UnreadableFile,

    #[error("sheet not recognized: an article column and a quantity column are required")]
    UnclassifiedSheet,

    // Request errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("credential missing: {0}")]
    CredentialMissing(String),

    // Infrastructure errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::MarketplaceUnavailable(_) => "REMOTE_UNAVAILABLE",
            AppError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            AppError::UnrecognizedFormat(FormatError::RemoteUnrecognized) => {
                "REMOTE_FORMAT_UNRECOGNIZED"
            }
            AppError::UnrecognizedFormat(FormatError::LocalUnrecognized) => {
                "LOCAL_FORMAT_UNRECOGNIZED"
            }
            AppError::UnreadableFile => "UNREADABLE_FILE",
            AppError::UnclassifiedSheet => "UNCLASSIFIED_SHEET",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::CredentialMissing(_) => "CREDENTIAL_MISSING",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::MarketplaceUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::UnrecognizedFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnreadableFile => StatusCode::BAD_REQUEST,
            AppError::UnclassifiedSheet => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CredentialMissing(_) => StatusCode::PRECONDITION_FAILED,
            AppError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };
        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        let detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            field,
            retry_after,
        };

        tracing::error!(code = detail.code.as_str(), "request failed: {:?}", self);

        (self.status(), Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
