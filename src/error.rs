//! Error taxonomy for graph acquisition.

use std::time::Duration;

use crate::types::{UserId, ValidationError};

/// Failure talking to the remote friend API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure (connect, TLS, reset, body read).
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("remote returned HTTP {0}")]
    Status(u16),
    /// Payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A concurrent batch failed because a sibling task failed or panicked.
    #[error("operation aborted: {0}")]
    Aborted(String),
    /// The operation deadline passed before the call completed.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

impl RemoteError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Status(_) => "REMOTE_NETWORK",
            Self::Decode(_) => "REMOTE_DECODE",
            Self::Aborted(_) => "REMOTE_ABORTED",
            Self::DeadlineExceeded(_) => "REMOTE_DEADLINE",
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Top-level error for session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Identity could not be resolved to canonical form.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Identity is not present in the current session.
    #[error("profile not found: {0}")]
    NotFound(UserId),
    /// Remote failure.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl GraphError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::Unresolvable(_)) => "UNRESOLVABLE",
            Self::Validation(ValidationError::UnsupportedDepth(_)) => "INVALID_DEPTH",
            Self::Validation(_) => "INVALID_IDENTITY",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Remote(e) => e.code(),
        }
    }
}
