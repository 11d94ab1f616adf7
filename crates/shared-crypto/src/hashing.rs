//! # Keccak-256 Hashing
//!
//! The Ethereum flavour of SHA-3 (original Keccak padding), used for
//! transaction signing payloads, header hashes and address derivation.

use sha3::{Digest, Keccak256};

/// 256-bit hash output.
pub type Hash = [u8; 32];

/// Hash data with Keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_vector() {
        // Well-known Keccak-256 of the empty string
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_different_inputs() {
        assert_ne!(keccak256(b"input1"), keccak256(b"input2"));
    }
}
