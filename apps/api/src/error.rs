//! Error types for the Cafe API.
//!
//! Every failure leaves the server as the same envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for LAT: available 3, requested 5",
//!   "details": []
//! }
//! ```
//!
//! ## Status Mapping
//!
//! | Code | Status |
//! |------|--------|
//! | `VALIDATION_FAILED`, `INVALID_AMOUNT` | 400 |
//! | `UNAUTHORIZED` | 401 |
//! | `FORBIDDEN` | 403 |
//! | `NOT_FOUND` | 404 |
//! | `INSUFFICIENT_STOCK`, `INSUFFICIENT_FUNDS`, `INVALID_STATE`, `DUPLICATE_KEY` | 409 |
//! | `INTERNAL` | 500 |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cafe_core::{CoreError, FieldError, ValidationError, ValidationErrors};
use cafe_db::DbError;
use serde::Serialize;
use tracing::error;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    InvalidAmount,
    Unauthorized,
    Forbidden,
    NotFound,
    InsufficientStock,
    InsufficientFunds,
    InvalidState,
    DuplicateKey,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidAmount => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock
            | ErrorCode::InsufficientFunds
            | ErrorCode::InvalidState
            | ErrorCode::DuplicateKey => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error on its way to the client.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Vec<FieldError>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Logs the cause and returns a generic 500.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "Unexpected failure");
        Self::new(ErrorCode::Internal, "Internal server error")
    }

    /// Same message for unknown email, wrong password and inactive account.
    pub fn invalid_credentials() -> Self {
        Self::unauthorized("Invalid email or password")
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: ErrorCode,
    message: &'a str,
    details: &'a [FieldError],
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            code: self.code,
            message: &self.message,
            details: &self.details,
        });
        (self.code.status(), body).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError {
            code: ErrorCode::ValidationFailed,
            message: "Validation failed".to_string(),
            details: errors.field_errors(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ValidationErrors::from(err).into()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match err {
            CoreError::Validation(errors) => return errors.into(),
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            CoreError::InvalidState { .. } => ErrorCode::InvalidState,
            CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
        };
        Self::new(code, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => Self::not_found(err.to_string()),
            DbError::UniqueViolation { ref field, .. } => ApiError {
                code: ErrorCode::DuplicateKey,
                message: err.to_string(),
                details: vec![FieldError {
                    field: field.clone(),
                    message: err.to_string(),
                }],
            },
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
