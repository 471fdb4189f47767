//! Error types for the Squad Quest API.
//!
//! Every failure returns a machine-checkable code plus a human-readable
//! reason, serialized as JSON with the matching HTTP status. Benign replays
//! of already-satisfied operations are success-shaped responses, not errors,
//! and are handled in the route layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use squadquest_core::{EngineError, StoreError};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,
    /// Authentication token is invalid or malformed
    InvalidToken,
    /// Authentication token has expired
    TokenExpired,
    /// Request is authenticated but lacks permission (wrong role)
    Forbidden,

    // ========================================================================
    // Validation errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,
    /// Request contains invalid input data
    InvalidInput,
    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Domain errors
    // ========================================================================
    /// Referenced user/quest/item does not exist (404)
    NotFound,
    /// A gameplay precondition failed: capacity, funds, duplicate claim,
    /// invalid code, already owned (403)
    PreconditionFailed,
    /// The daily bounty cooldown is still running (403)
    CooldownActive,
    /// No coupon codes remain for the requested voucher (503)
    OutOfStock,
    /// Concurrent writes exhausted the store's retry budget (409)
    Conflict,

    // ========================================================================
    // Server errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden
            | ErrorCode::PreconditionFailed
            | ErrorCode::CooldownActive => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::OutOfStock => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::NotFound => "Entity not found",
            ErrorCode::PreconditionFailed => "Precondition failed",
            ErrorCode::CooldownActive => "Cooldown active",
            ErrorCode::OutOfStock => "Out of Stock",
            ErrorCode::Conflict => "Concurrent modification detected, please retry",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response returned by every endpoint on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Present (true) only on cooldown rejections, so clients can branch
    /// without string-matching the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<bool>,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cooldown: None,
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    fn cooldown_active(retry_in_secs: i64) -> Self {
        let mut err = Self::new(
            ErrorCode::CooldownActive,
            format!("Cooldown active, try again in {}s", retry_in_secs),
        );
        err.cooldown = Some(true);
        err.details = Some(serde_json::json!({ "retry_in_secs": retry_in_secs }));
        err
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => ApiError::not_found(err.to_string()),
            EngineError::PreconditionFailed { reason } => {
                ApiError::new(ErrorCode::PreconditionFailed, reason)
            }
            EngineError::CooldownActive { retry_in_secs } => {
                ApiError::cooldown_active(retry_in_secs)
            }
            EngineError::OutOfStock => ApiError::from_code(ErrorCode::OutOfStock),
            EngineError::Unauthorized { reason } => ApiError::unauthorized(reason),
            EngineError::Forbidden { reason } => ApiError::forbidden(reason),
            EngineError::TransientConflict { .. } => ApiError::from_code(ErrorCode::Conflict),
            EngineError::Internal { reason } => {
                tracing::error!(error = %reason, "engine internal error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contention { .. } => ApiError::from_code(ErrorCode::Conflict),
            other => {
                tracing::error!(error = %other, "store error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
