//! Error types for erpboard-client

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("HTTP {status} requesting {resource}: {message}")]
    Http {
        status: u16,
        resource: String,
        message: String,
    },

    #[error("Network error requesting {resource}: {message}")]
    Network { resource: String, message: String },

    #[error("Invalid JSON from {resource}: {message}")]
    Decode { resource: String, message: String },

    #[error("Response for {resource} is missing array field '{field}'")]
    MissingField { resource: String, field: String },

    #[error("Unexpected response shape for {resource}: {message}")]
    InvalidShape { resource: String, message: String },

    #[error("HTTP client setup failed: {message}")]
    Setup { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClientError {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Payload did not match the endpoint schema
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::MissingField { .. }
                | ClientError::InvalidShape { .. }
                | ClientError::Decode { .. }
        )
    }
}
