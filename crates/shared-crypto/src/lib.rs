//! # Shared Crypto - Signing Primitives for Block Production
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Signing payloads, header hashes, addresses |
//! | `ecdsa` | secp256k1 (recoverable) | Block seals, transaction signatures |
//! | `protected` | XChaCha20-Poly1305 | Private keys held encrypted in memory |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization (EIP-2)
//! - **ProtectedKey**: plaintext exists only inside a scoped `UnprotectedKey`
//!   guard and is zeroized when the guard drops

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod protected;

// Re-exports
pub use ecdsa::{
    recover_address, recover_public_key, Address, Secp256k1KeyPair, Secp256k1PublicKey,
    Secp256k1Signature,
};
pub use errors::CryptoError;
pub use hashing::{keccak256, Hash};
pub use protected::{ProtectedKey, UnprotectedKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
