//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::api::ApiResponse;

/// Machine-readable error codes carried in the response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationFailed,
    BadRequest,
    DuplicateIsbn,
    InsufficientStock,
    InternalFailure,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate isbn: {0}")]
    DuplicateIsbn(String),

    #[error("Not enough copies available: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Structured error detail placed in the envelope's `error` field
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    #[schema(value_type = Object)]
    pub details: Value,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidFields(_)
            | AppError::BadRequest(_)
            | AppError::DuplicateIsbn(_)
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) | AppError::InvalidFields(_) => ErrorCode::ValidationFailed,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::DuplicateIsbn(_) => ErrorCode::DuplicateIsbn,
            AppError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalFailure,
        }
    }

    /// Envelope message and error details for this failure
    fn message_and_details(&self) -> (String, Value) {
        match self {
            AppError::NotFound(msg) => (msg.clone(), Value::String(msg.clone())),
            AppError::Validation(msg) => ("Validation failed".to_string(), Value::String(msg.clone())),
            AppError::InvalidFields(errors) => (
                "Validation failed".to_string(),
                serde_json::to_value(errors).unwrap_or(Value::Null),
            ),
            AppError::BadRequest(msg) => ("Invalid request".to_string(), Value::String(msg.clone())),
            AppError::DuplicateIsbn(isbn) => (
                "Validation failed".to_string(),
                Value::String(format!("A book with isbn {} already exists", isbn)),
            ),
            AppError::InsufficientStock { available, .. } => (
                "Not enough copies available".to_string(),
                Value::String(format!("Only {} copies available", available)),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Internal server error".to_string(), Value::Null)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), Value::Null)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = self.message_and_details();

        let body: ApiResponse<()> = ApiResponse::failure(message, ErrorDetail { code, details });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
