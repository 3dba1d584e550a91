//! Error type system for the credential checker
//!
//! This module provides the error taxonomy shared by the store, the rate limiter
//! and the HTTP surface:
//! - Classification into client errors, rejections and transient store failures
//! - HTTP status code mapping
//! - Error responses carrying a trace ID

use crate::api::middleware::rate_limit::RateLimitError;
use crate::api::middleware::trace::current_trace_id;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Main error type for the credential checker
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    // Startup errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    // Request errors
    #[error("Validation error on `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    // Store errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    // I/O errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CheckerError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CheckerError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 422 Unprocessable Entity
            CheckerError::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            CheckerError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable
            CheckerError::StoreUnavailable(_)
            | CheckerError::DatabaseError(_)
            | CheckerError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            CheckerError::InitializationError(_)
            | CheckerError::ConfigError(_)
            | CheckerError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            CheckerError::InitializationError(_) => "InitializationError",
            CheckerError::ConfigError(_) => "ConfigError",
            CheckerError::ValidationError { .. } => "ValidationError",
            CheckerError::RateLimited(_) => "RateLimitExceeded",
            CheckerError::StoreUnavailable(_) => "StoreUnavailable",
            CheckerError::DatabaseError(_) => "StoreUnavailable",
            CheckerError::Timeout(_) => "StoreUnavailable",
            CheckerError::IoError(_) => "IoError",
        }
    }

    /// Transient failures the caller may retry later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckerError::StoreUnavailable(_)
                | CheckerError::DatabaseError(_)
                | CheckerError::Timeout(_)
                | CheckerError::RateLimited(_)
        )
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            CheckerError::ValidationError { field, message } => Some(serde_json::json!({
                "field": field,
                "reason": message,
            })),
            _ => None,
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response carrying the current request's trace ID,
    /// or a fresh one outside a request
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
            trace_id: current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// Create an error response from a CheckerError
    ///
    /// Store and startup failures are reported with a fixed message; their
    /// detail goes to the log only.
    pub fn from_error(error: &CheckerError) -> Self {
        let message = match error.status_code() {
            StatusCode::SERVICE_UNAVAILABLE => {
                "The credential store is temporarily unavailable, retry later".to_string()
            }
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => error.to_string(),
        };
        let mut response = Self::new(error.error_type().to_string(), message);
        response.details = error.details();
        response
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}{} (trace_id: {})",
            self.error,
            self.message,
            self.details.as_ref().map_or("", |_| " with details"),
            self.trace_id
        )
    }
}

/// Implement IntoResponse for CheckerError to enable automatic error handling in Axum
impl IntoResponse for CheckerError {
    fn into_response(self) -> Response {
        // The limiter owns its wire format (Retry-After header and details)
        if let CheckerError::RateLimited(err) = self {
            tracing::warn!(error_type = "RateLimitExceeded", "Request rejected: {}", err);
            return err.into_response();
        }

        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with CheckerError
pub type Result<T> = std::result::Result<T, CheckerError>;

/// Context extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let context_str = context.into();
            CheckerError::InitializationError(format!("{}: {}", context_str, e))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context_str = f();
            CheckerError::InitializationError(format!("{}: {}", context_str, e))
        })
    }
}
