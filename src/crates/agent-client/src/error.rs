//! Error types for remote agent runtime clients.

use thiserror::Error;

/// Result type for agent runtime operations.
pub type Result<T> = std::result::Result<T, AgentClientError>;

/// Errors that can occur when talking to a remote agent runtime.
#[derive(Debug, Error)]
pub enum AgentClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Runtime rejected the credential.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Credential could not be acquired.
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// Agent, thread, or run does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Non-success response that has no dedicated variant.
    #[error("Agent runtime error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AgentClientError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentClientError::HttpError(_) | AgentClientError::RateLimitExceeded(_) => true,
            AgentClientError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if the remote resource is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AgentClientError::NotFound(_))
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AgentClientError::AuthenticationError(_) | AgentClientError::CredentialUnavailable(_)
        )
    }
}

impl From<serde_json::Error> for AgentClientError {
    fn from(err: serde_json::Error) -> Self {
        AgentClientError::SerializationError(err.to_string())
    }
}
