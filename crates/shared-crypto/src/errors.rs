//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Sealing key material in memory failed
    #[error("Key protection failed: {0}")]
    ProtectionFailed(String),

    /// Recovering key material from its protected form failed
    #[error("Key unprotection failed: {0}")]
    UnprotectionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signing a prehash failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid recovery id (only 0..=3 are defined for secp256k1)
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("Public key recovery failed")]
    RecoveryFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,
}
