//! Unified engine error types
//!
//! Provides a single error type for every engine operation,
//! suitable for handing straight back to the request-routing layer.
//!
//! Absence (unknown session, unknown item, unknown report) is not an
//! error here: lookups return `Option` and the caller decides how to
//! present a missing record.

use serde::Serialize;
use thiserror::Error;

/// Engine-level error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Rating outside the accepted 1..=5 range
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    /// Comment content was empty or whitespace only
    #[error("Comment content must not be empty")]
    EmptyComment,

    /// Session reference was empty or malformed
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Unrecognised report type tag
    #[error("Unknown report type: {0}")]
    UnknownReportType(String),

    /// Unrecognised comment moderation status
    #[error("Unknown comment status: {0}")]
    UnknownCommentStatus(String),

    /// A component lock was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File operation error
    #[error("File operation error: {0}")]
    Io(#[from] std::io::Error),

    /// Data serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable machine-readable code for client-side handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRating(_)
            | Self::EmptyComment
            | Self::InvalidSessionId(_)
            | Self::UnknownReportType(_)
            | Self::UnknownCommentStatus(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::LockPoisoned(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors caused by caller input rather than engine state
    pub fn is_validation(&self) -> bool {
        self.code() == "VALIDATION_ERROR"
    }
}

/// Serializable error response for the routing layer
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl From<EngineError> for ErrorResponse {
    fn from(err: EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidRating(6);
        assert_eq!(err.to_string(), "Rating must be between 1 and 5, got 6");
    }

    #[test]
    fn test_validation_codes() {
        assert!(EngineError::EmptyComment.is_validation());
        assert!(EngineError::InvalidSessionId(String::new()).is_validation());
        assert!(!EngineError::LockPoisoned("metrics").is_validation());
        assert_eq!(EngineError::LockPoisoned("metrics").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_serialization() {
        let err = EngineError::UnknownReportType("yearly".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("VALIDATION_ERROR"));
        assert!(json.contains("yearly"));
    }

    #[test]
    fn test_error_response_from() {
        let response: ErrorResponse = EngineError::Config("zero capacity".to_string()).into();
        assert_eq!(response.code, "CONFIG_ERROR");
        assert!(response.message.contains("zero capacity"));
    }
}
