//! Error types for block production subsystem

use shared_crypto::CryptoError;
use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Errors that can occur during block production
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BlockProductionError {
    /// Sign/SignTransaction called while no key is configured
    #[error("Cannot sign without provided key")]
    SignerNotConfigured,

    /// Cooperative shutdown; never a failure
    #[error("Block production cancelled")]
    Cancelled,

    /// Start called while a loop is still registered
    #[error("Block producer already running")]
    AlreadyRunning,

    /// Candidate assembly failed
    #[error("Assembly error: {0}")]
    Assembly(String),

    /// Sealing the candidate failed
    #[error("Sealing error: {0}")]
    Sealing(String),

    /// Handing the sealed block downstream failed
    #[error("Submission error: {0}")]
    Submission(String),

    /// Underlying cryptographic failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Encoding error (RLP payloads, EIP-155 `v` overflow)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g. the loop task panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlockProductionError {
    /// Expected shutdown path: not logged as an error, not counted as a failed seal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the caller can retry after fixing its own state
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SignerNotConfigured)
    }
}
