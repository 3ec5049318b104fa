//! Error types for vault operations.
//!
//! Every failure the core can produce is surfaced as a [`VaultError`];
//! nothing is retried or swallowed inside the library. The binary maps these
//! to user-facing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Reasons a recovery hint is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("hint is too short")]
    TooShort,

    #[error("hint is too long")]
    TooLong,

    #[error("hint must not contain the passphrase")]
    ContainsPassphrase,
}

#[derive(Debug, Error)]
pub enum VaultError {
    /// MAC verification of the master secret record failed.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    #[error("invalid hint: {0}")]
    Hint(#[from] HintError),

    #[error("new passphrase cannot be empty")]
    EmptyPassphrase,

    /// Malformed or unauthenticated ciphertext or image payload.
    #[error("decode error: {0}")]
    Decode(String),

    /// A size or memory limit was exceeded while decrypting or scaling.
    #[error("out of resources: {0}")]
    OutOfResources(String),

    #[error("malformed salt: expected {expected} bytes, got {actual}")]
    MalformedSalt { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("corrupted master secret record: {0}")]
    CorruptRecord(String),

    #[error("vault already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("vault does not exist at {}", .0.display())]
    NotFound(PathBuf),

    /// A background operation is still outstanding for this session.
    #[error("another operation is already in progress")]
    Busy,

    #[error("background task failed: {0}")]
    Worker(String),

    #[error("session is locked")]
    Locked,

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl VaultError {
    /// Content-level failures a caller should treat as "no preview".
    pub fn is_content_failure(&self) -> bool {
        matches!(self, VaultError::Decode(_) | VaultError::OutOfResources(_))
    }
}
