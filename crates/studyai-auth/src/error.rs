//! Auth error types

use thiserror::Error;

use crate::classify::ClassifiedError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No response was obtained: connection failure or exhausted retries.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Token decode error: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Storage error: {0}")]
    Storage(#[from] studyai_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// User-safe form of any of the above, produced by login and signup.
    #[error("{}", .0.message)]
    Classified(ClassifiedError),
}

impl AuthError {
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            AuthError::Classified(c) => Some(c),
            _ => None,
        }
    }
}
