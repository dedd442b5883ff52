//! Common error types for PassVault.

use thiserror::Error;

/// Top-level error type for PassVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input was rejected (empty field, duplicate or reserved name).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The named entry or category does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The key artifact could not be read or written.
    #[error("Key I/O error: {0}")]
    KeyIo(String),

    /// An artifact could not be written or read back from storage.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Authenticated decryption failed: wrong key, truncation or tampering.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Cryptographic misuse, such as a key of the wrong length.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failed operation left state untouched and may be retried.
    ///
    /// Storage failures leave the in-memory vault unchanged, so the caller
    /// can simply repeat the operation. Validation and lookup failures will
    /// fail again with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeyIo(_) | Self::Persistence(_) | Self::Io(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
