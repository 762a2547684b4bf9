//! Error types for SQLChat.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for SQLChat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A required form field is missing or blank.
    #[error("{0}")]
    Validation(String),

    /// Database connection errors (host unreachable, auth failed, probe failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The embedded database file does not exist.
    #[error("Database file not found: {0}")]
    NotFound(String),

    /// The model endpoint rejected (or could not verify) the API key.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The agent failed to answer a question.
    #[error("Query error: {0}")]
    Query(String),

    /// LLM transport or protocol errors (rate limits, timeouts, bad payloads, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, bad CLI arguments, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (terminal failures, unexpected states, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a not-found error for the given path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Connection(m)
            | Self::NotFound(m)
            | Self::Auth(m)
            | Self::Query(m)
            | Self::Llm(m)
            | Self::Config(m)
            | Self::Internal(m) => m,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Connection(_) => "Connection Error",
            Self::NotFound(_) => "Not Found",
            Self::Auth(_) => "Authentication Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors that block session start until the form is corrected.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Connection(_) | Self::NotFound(_) | Self::Auth(_)
        )
    }
}

/// Result type alias using ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = ChatError::validation("Please provide MySQL host");
        assert_eq!(err.to_string(), "Please provide MySQL host");
        assert_eq!(err.category(), "Validation Error");
    }

    #[test]
    fn test_error_display_connection() {
        let err = ChatError::connection("Cannot connect to localhost:3306");
        assert_eq!(
            err.to_string(),
            "Connection error: Cannot connect to localhost:3306"
        );
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = ChatError::not_found("/tmp/student.db");
        assert_eq!(err.to_string(), "Database file not found: /tmp/student.db");
        assert_eq!(err.category(), "Not Found");
    }

    #[test]
    fn test_error_display_auth() {
        let err = ChatError::auth("Invalid API key");
        assert_eq!(err.to_string(), "Authentication error: Invalid API key");
    }

    #[test]
    fn test_error_display_query() {
        let err = ChatError::query("no such table: STUDENTS");
        assert_eq!(err.to_string(), "Query error: no such table: STUDENTS");
        assert_eq!(err.category(), "Query Error");
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = ChatError::query("no such column: GRADE");
        assert_eq!(err.message(), "no such column: GRADE");
    }

    #[test]
    fn test_startup_fatality() {
        assert!(ChatError::validation("x").is_fatal_at_startup());
        assert!(ChatError::connection("x").is_fatal_at_startup());
        assert!(ChatError::not_found("x").is_fatal_at_startup());
        assert!(ChatError::auth("x").is_fatal_at_startup());
        assert!(!ChatError::query("x").is_fatal_at_startup());
        assert!(!ChatError::llm("x").is_fatal_at_startup());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatError>();
    }
}
