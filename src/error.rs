//! Error types for the chat relay
//!
//! Defines application-level errors, client-facing validation errors,
//! cipher errors and outbound send errors.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (session or process termination) and
/// business errors (reply sent to the client, connection stays open).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on a connection (fatal to that session)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binding the listening socket failed (fatal to the process)
    #[error("Failed to bind {addr}: {source}")]
    Listener {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Username rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal channel broken
    #[error(transparent)]
    Send(#[from] SendError),

    /// Outbound frame could not be sealed
    #[error(transparent)]
    Seal(#[from] SealError),
}

/// Username negotiation and rename errors
///
/// Recoverable: reported to the offending client, the connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Fails the length or character-set rule
    #[error("Invalid username format")]
    InvalidFormat,

    /// Another live connection holds the name
    #[error("Username already taken")]
    Taken,

    /// The connection has no registered session
    #[error("Connection not registered")]
    NotRegistered,
}

/// Frame could not be opened
///
/// Recoverable: the frame is logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Frame shorter than the nonce
    #[error("Frame too short: {len} bytes")]
    TooShort { len: usize },

    /// Tampered data, wrong key or truncated frame
    #[error("Frame failed authentication")]
    Authentication,
}

/// Plaintext could not be sealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to seal frame")]
pub struct SealError;

/// Configuration and key-material errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Encryption is enabled but no key was provisioned
    #[error("Encryption enabled but no key provided (use --key-file or RELAY_KEY)")]
    MissingKey,

    /// Key is not valid base64
    #[error("Key is not valid base64: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    /// Key decodes to the wrong number of bytes
    #[error("Key must be {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected schema
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// A capacity setting is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// `max_frame_len` cannot carry the server's replies
    #[error("max_frame_len must be at least {min}, got {actual}")]
    FrameTooSmall { min: usize, actual: usize },
}

/// Message send errors
///
/// Occurs when attempting to send through closed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection's writer task has stopped
    #[error("Outbox closed")]
    OutboxClosed,

    /// The broadcast hub has stopped
    #[error("Broadcast queue closed")]
    QueueClosed,
}
