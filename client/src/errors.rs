//! Error types for the lab deployment client

use http::StatusCode;
use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    TransientFetchError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Map a non-success response status onto the error taxonomy
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        let message = format!("{}: {}", status, detail);
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::UNAUTHORIZED => ClientError::AuthError(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                ClientError::TransientFetchError(message)
            }
            s if s.is_server_error() => ClientError::TransientFetchError(message),
            _ => ClientError::HttpError(message),
        }
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::TransientFetchError(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::DecodeError(err.to_string());
        }
        if let Some(status) = err.status() {
            return ClientError::from_status(status, err.to_string());
        }
        if err.is_builder() {
            return ClientError::ConfigError(err.to_string());
        }
        // connect, timeout, body and redirect failures never reached a handler
        ClientError::TransientFetchError(err.to_string())
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        ClientError::Internal(err.to_string())
    }
}
