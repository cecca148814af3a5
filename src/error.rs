//! Error types for the Taggr client

use thiserror::Error;

use crate::transport::TransportError;

/// Client error
#[derive(Debug, Error)]
pub enum TaggrError {
    /// Transport construction, trust bootstrap, or network I/O failed
    #[error("session error: {0}")]
    Session(String),

    /// The canister rejected a call or returned an unusable reply
    #[error("{method}: {message}")]
    Protocol { method: String, message: String },

    /// Remote data violated the expected shape
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TaggrError {
    pub(crate) fn protocol(method: &str, message: impl Into<String>) -> Self {
        TaggrError::Protocol {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

impl From<TransportError> for TaggrError {
    fn from(e: TransportError) -> Self {
        TaggrError::Session(e.to_string())
    }
}

/// Field-qualified validation failure.
///
/// Validators either return a fully populated record or this error naming
/// the offending field; partially populated records are never produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the field that failed (e.g. `post.tags`)
    pub field: String,
    /// What was expected instead
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, TaggrError>;
