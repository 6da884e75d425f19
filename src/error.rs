//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout pgrail.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `InvalidIdentifier`: Table/column/schema name failed validation
//! - `InvalidRole`: Database role name failed validation
//! - `InvalidLimit`: Retrieval limit outside the permitted range
//! - `EmptyPlaceholder`: Blank placeholder token in custom-query mode
//! - `ConnectionFailed`: Database connection errors
//! - `QueryFailed`: Query or transaction execution errors
//!
//! Validation errors (`InvalidIdentifier`, `InvalidRole`, `InvalidLimit`,
//! `EmptyPlaceholder`) are always raised before any database I/O.

use thiserror::Error;

/// Main error type for pgrail operations
#[derive(Error, Debug)]
pub enum RailError {
    /// SQL identifier (table, column, schema) failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Database role name failed validation
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Retrieval limit outside the permitted range
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Placeholder token is blank in custom-query mode
    #[error("Placeholder token must not be blank")]
    EmptyPlaceholder,

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query or transaction execution failed (wraps the driver's message)
    #[error("Query execution failed: {0}")]
    QueryFailed(String),
}

impl RailError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling by agents.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::InvalidRole(_) => "INVALID_ROLE",
            Self::InvalidLimit(_) => "INVALID_LIMIT",
            Self::EmptyPlaceholder => "EMPTY_PLACEHOLDER",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
        }
    }

    /// Get human-readable error message (agent-appropriate, no sensitive data)
    ///
    /// This message is safe to include in JSON output.
    /// It does not contain credentials or other sensitive information.
    #[must_use]
    pub fn message(&self) -> String {
        // Use Display implementation from thiserror
        self.to_string()
    }

    /// True for input-validation failures raised before any database I/O
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_)
                | Self::InvalidRole(_)
                | Self::InvalidLimit(_)
                | Self::EmptyPlaceholder
        )
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create an invalid role error
    pub fn invalid_role(message: impl Into<String>) -> Self {
        Self::InvalidRole(message.into())
    }

    /// Create an invalid limit error
    pub fn invalid_limit(message: impl Into<String>) -> Self {
        Self::InvalidLimit(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }
}

/// Result type alias for pgrail operations
pub type Result<T> = std::result::Result<T, RailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RailError::invalid_identifier("t").error_code(), "INVALID_IDENTIFIER");
        assert_eq!(RailError::invalid_role("t").error_code(), "INVALID_ROLE");
        assert_eq!(RailError::invalid_limit("t").error_code(), "INVALID_LIMIT");
        assert_eq!(RailError::EmptyPlaceholder.error_code(), "EMPTY_PLACEHOLDER");
        assert_eq!(RailError::connection_failed("t").error_code(), "CONNECTION_FAILED");
        assert_eq!(RailError::query_failed("t").error_code(), "QUERY_FAILED");
    }

    #[test]
    fn test_error_messages() {
        let err = RailError::invalid_identifier("users; DROP TABLE users");
        assert!(err.message().contains("users; DROP TABLE users"));

        let err = RailError::query_failed("relation \"docs\" does not exist");
        assert!(err.message().contains("relation \"docs\" does not exist"));
    }

    #[test]
    fn test_validation_errors_flagged() {
        assert!(RailError::invalid_identifier("t").is_validation());
        assert!(RailError::invalid_role("t").is_validation());
        assert!(RailError::invalid_limit("t").is_validation());
        assert!(RailError::EmptyPlaceholder.is_validation());
        assert!(!RailError::connection_failed("t").is_validation());
        assert!(!RailError::query_failed("t").is_validation());
    }

    #[test]
    fn test_error_constructors() {
        let err = RailError::invalid_identifier("test");
        assert!(matches!(err, RailError::InvalidIdentifier(_)));

        let err = RailError::invalid_role("test");
        assert!(matches!(err, RailError::InvalidRole(_)));

        let err = RailError::invalid_limit("test");
        assert!(matches!(err, RailError::InvalidLimit(_)));

        let err = RailError::connection_failed("test");
        assert!(matches!(err, RailError::ConnectionFailed(_)));

        let err = RailError::query_failed("test");
        assert!(matches!(err, RailError::QueryFailed(_)));
    }
}
