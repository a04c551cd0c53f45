//! Error types for grafit-chat

use thiserror::Error;

/// Result type alias for grafit-chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in grafit-chat
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad config file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Chat completion error
    #[error("completion error: {0}")]
    Completion(String),

    /// User or assistant message with no content
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Session not found in the registry
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
