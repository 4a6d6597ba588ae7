//! Error types for remote annotation and lock calls.

use thiserror::Error;

/// Errors returned by an [`super::AnnotationApi`] or [`super::LockApi`] backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure; the request may not have reached the server
    #[error("Network error: {0}")]
    Network(String),

    /// The addressed resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server refused the request
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Create a network error from any displayable cause.
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::Network(cause.to_string())
    }

    /// Create a not-found error for a resource name.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}
