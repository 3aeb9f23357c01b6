//! Error taxonomy for the streaming test engine.
//!
//! Every failure raised while opening a channel, encoding a stimulus, sending or
//! consuming a turn ends up as a [`TesterError`]. Negative verification results
//! are *not* errors; they are carried by [`crate::core::Outcome`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while executing a test case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TesterError {
    /// Required identity/region parameters are missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stimulus audio could not be parsed or resampled
    #[error("Decode error: {0}")]
    Decode(String),

    /// Channel open/send/receive failure or speech service failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A deadline was exceeded
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Unexpected failure inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for tester operations.
pub type TesterResult<T> = Result<T, TesterError>;

/// Stable, serializable classification of a [`TesterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigError,
    DecodeError,
    TransportError,
    TimeoutError,
    InternalError,
}

impl ErrorKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "config_error",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::TimeoutError => "timeout_error",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TesterError {
    /// Get the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TesterError::Config(_) => ErrorKind::ConfigError,
            TesterError::Decode(_) => ErrorKind::DecodeError,
            TesterError::Transport(_) => ErrorKind::TransportError,
            TesterError::Timeout(_) => ErrorKind::TimeoutError,
            TesterError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Render the error as a single-line trace suitable for reports.
    pub fn trace(&self) -> String {
        format!("[{}] {}", self.kind(), self)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TesterError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TesterError::Transport(format!("WebSocket error: {err}"))
    }
}

impl From<reqwest::Error> for TesterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TesterError::Timeout(format!("HTTP request timed out: {err}"))
        } else {
            TesterError::Transport(format!("HTTP request failed: {err}"))
        }
    }
}

impl From<hound::Error> for TesterError {
    fn from(err: hound::Error) -> Self {
        TesterError::Decode(format!("Invalid WAV audio: {err}"))
    }
}

impl From<serde_json::Error> for TesterError {
    fn from(err: serde_json::Error) -> Self {
        TesterError::Transport(format!("Malformed message: {err}"))
    }
}

impl From<base64::DecodeError> for TesterError {
    fn from(err: base64::DecodeError) -> Self {
        TesterError::Transport(format!("Invalid base64 payload: {err}"))
    }
}
