//! API error types

use thiserror::Error;

/// Status code the server uses to signal quota exhaustion
const QUOTA_EXCEEDED_CODE: u16 = 403;

/// Message fragment that distinguishes quota exhaustion from other 403s
const QUOTA_EXCEEDED_MESSAGE: &str = "rate limit exceeded";

/// Errors produced by API calls and the queue that paces them
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Queue closed before the operation completed")]
    QueueClosed,
}

impl ApiError {
    /// Build a remote API error from a status code and message
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        ApiError::Api {
            code,
            message: message.into(),
        }
    }

    /// HTTP-like status code carried by this error, if any
    pub fn code(&self) -> Option<u16> {
        match self {
            ApiError::Api { code, .. } => Some(*code),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Human readable message carried by this error
    pub fn message(&self) -> String {
        match self {
            ApiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if the server rejected the call because the quota ran out
    ///
    /// Only these failures are resubmitted by the queue; everything else is terminal.
    pub fn is_quota_exceeded(&self) -> bool {
        self.code() == Some(QUOTA_EXCEEDED_CODE) && self.message().contains(QUOTA_EXCEEDED_MESSAGE)
    }
}
