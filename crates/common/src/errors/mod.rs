//! Error types for VeriDoc services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    UnsupportedFileType,
    FileTooLarge,
    BatchTooLarge,

    // Authentication errors (2xxx)
    Unauthorized,
    ExpiredToken,

    // Resource errors (4xxx)
    NotFound,
    DocumentNotFound,
    ScanResultNotFound,
    NotificationNotFound,

    // Conflict errors (5xxx)
    Conflict,
    AnalysisInProgress,
    AlreadyReviewed,

    // Oracle refusal (6xxx)
    RateLimited,
    QuotaExhausted,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    OracleError,
    EmptyAnalysis,
    StorageError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::UnsupportedFileType => 1002,
            ErrorCode::FileTooLarge => 1003,
            ErrorCode::BatchTooLarge => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::ExpiredToken => 2002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::DocumentNotFound => 4002,
            ErrorCode::ScanResultNotFound => 4003,
            ErrorCode::NotificationNotFound => 4004,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::AnalysisInProgress => 5002,
            ErrorCode::AlreadyReviewed => 5003,

            // Oracle refusal (6xxx)
            ErrorCode::RateLimited => 6001,
            ErrorCode::QuotaExhausted => 6002,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::OracleError => 8001,
            ErrorCode::EmptyAnalysis => 8002,
            ErrorCode::StorageError => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Unsupported file type: {mime_type}. Allowed types: PDF, JPEG, PNG")]
    UnsupportedFileType { mime_type: String },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Too many files: {count} exceeds batch limit of {limit}")]
    BatchTooLarge { count: usize, limit: usize },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Scan result not found: {id}")]
    ScanResultNotFound { id: String },

    #[error("Notification not found: {id}")]
    NotificationNotFound { id: String },

    // Conflict errors
    #[error("Analysis already in progress for document {id}")]
    AnalysisInProgress { id: String },

    #[error("Document {id} has already been reviewed")]
    AlreadyReviewed { id: String },

    // Oracle refusal
    #[error("Rate limit exceeded. Please try again in a few minutes.")]
    RateLimited,

    #[error("AI credits exhausted. Please add credits to continue.")]
    QuotaExhausted,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Analysis failed: {message}")]
    OracleError { message: String },

    #[error("No analysis content received")]
    EmptyAnalysis,

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            AppError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            AppError::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::ScanResultNotFound { .. } => ErrorCode::ScanResultNotFound,
            AppError::NotificationNotFound { .. } => ErrorCode::NotificationNotFound,
            AppError::AnalysisInProgress { .. } => ErrorCode::AnalysisInProgress,
            AppError::AlreadyReviewed { .. } => ErrorCode::AlreadyReviewed,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::QuotaExhausted => ErrorCode::QuotaExhausted,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::OracleError { .. } => ErrorCode::OracleError,
            AppError::EmptyAnalysis => ErrorCode::EmptyAnalysis,
            AppError::StorageError { .. } => ErrorCode::StorageError,
            AppError::HttpClient(_) => ErrorCode::OracleError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 402 Payment Required
            AppError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::DocumentNotFound { .. }
            | AppError::ScanResultNotFound { .. }
            | AppError::NotificationNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AnalysisInProgress { .. } | AppError::AlreadyReviewed { .. } => {
                StatusCode::CONFLICT
            }

            // 413 Payload Too Large
            AppError::FileTooLarge { .. } | AppError::BatchTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }

            // 415 Unsupported Media Type
            AppError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::StorageError { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::OracleError { .. }
            | AppError::EmptyAnalysis
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether the caller may retry the failed analysis
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited
                | AppError::QuotaExhausted
                | AppError::OracleError { .. }
                | AppError::EmptyAnalysis
                | AppError::HttpClient(_)
                | AppError::StorageError { .. }
        )
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    /// Whether an explicit retry may succeed (transport/oracle-refusal failures)
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let retryable = self.is_retryable();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                retryable,
                request_id: None, // Filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_oracle_refusal_statuses() {
        assert_eq!(
            AppError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::QuotaExhausted.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert!(AppError::RateLimited.is_retryable());
        assert!(AppError::QuotaExhausted.is_retryable());
    }

    #[test]
    fn test_validation_error_is_not_retryable() {
        let err = AppError::FileTooLarge {
            size: 12 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!err.is_retryable());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
