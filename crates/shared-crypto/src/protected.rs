//! # Protected Private Keys
//!
//! A signing key held encrypted in memory and decrypted only for the span of
//! a single signing operation.
//!
//! ## Lifecycle
//!
//! ```text
//! raw bytes ──ProtectedKey::new──▶ XChaCha20-Poly1305(entropy, nonce) ciphertext
//!                                        │
//!                         unprotect()    ▼
//!                              UnprotectedKey (scoped guard)
//!                                        │  drop
//!                                        ▼
//!                              scalar zeroized
//! ```
//!
//! The per-key `entropy` is random and never leaves this module. The public
//! key and address are cached at construction so identity queries never
//! decrypt anything.

use crate::ecdsa::{Address, Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
use crate::hashing::Hash;
use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

const SECRET_KEY_LENGTH: usize = 32;

/// Private key material encrypted under a random in-memory secret.
pub struct ProtectedKey {
    entropy: Zeroizing<[u8; 32]>,
    nonce: [u8; 24],
    ciphertext: Vec<u8>,
    public_key: Secp256k1PublicKey,
    address: Address,
}

impl ProtectedKey {
    /// Protect a raw 32-byte secp256k1 secret.
    ///
    /// The caller still owns `secret` and is responsible for clearing it.
    pub fn new(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let key_pair = Secp256k1KeyPair::from_bytes(secret)?;

        let mut entropy = Zeroizing::new([0u8; 32]);
        let mut nonce = [0u8; 24];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut *entropy);
        rng.fill_bytes(&mut nonce);

        let sealing_key: &[u8; 32] = &entropy;
        let cipher = XChaCha20Poly1305::new(sealing_key.into());
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), secret.as_slice())
            .map_err(|e| CryptoError::ProtectionFailed(e.to_string()))?;

        Ok(Self {
            entropy,
            nonce,
            ciphertext,
            public_key: key_pair.public_key(),
            address: key_pair.address(),
        })
    }

    /// Protect a key given as a byte slice, e.g. freshly decoded from a key file.
    pub fn from_slice(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.len() != SECRET_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_LENGTH,
                actual: secret.len(),
            });
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(secret);
        Self::new(&bytes)
    }

    /// Generate a fresh random key and protect it immediately.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        loop {
            rand::thread_rng().fill_bytes(&mut *bytes);
            match Self::new(&bytes) {
                // Out-of-range scalars are astronomically rare; draw again.
                Err(CryptoError::InvalidPrivateKey) => continue,
                other => return other,
            }
        }
    }

    /// Compressed public key of the protected secret.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        self.public_key
    }

    /// Ethereum address of the protected secret.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Decrypt into a scoped guard. The plaintext lives only inside the
    /// returned [`UnprotectedKey`] and is wiped when it drops, whether or
    /// not the signing call that needed it succeeded.
    pub fn unprotect(&self) -> Result<UnprotectedKey, CryptoError> {
        let sealing_key: &[u8; 32] = &self.entropy;
        let cipher = XChaCha20Poly1305::new(sealing_key.into());
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(XNonce::from_slice(&self.nonce), self.ciphertext.as_slice())
                .map_err(|e| CryptoError::UnprotectionFailed(e.to_string()))?,
        );

        if plaintext.len() != SECRET_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_LENGTH,
                actual: plaintext.len(),
            });
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&plaintext);

        Ok(UnprotectedKey {
            key_pair: Secp256k1KeyPair::from_bytes(&secret)?,
        })
    }
}

impl Drop for ProtectedKey {
    fn drop(&mut self) {
        self.ciphertext.zeroize();
        self.nonce.zeroize();
    }
}

impl std::fmt::Debug for ProtectedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedKey")
            .field("address", &AddressHex(&self.address))
            .finish_non_exhaustive()
    }
}

struct AddressHex<'a>(&'a Address);

impl std::fmt::Debug for AddressHex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Temporary access to a decrypted key.
///
/// Not `Clone`; borrow it for the signing call and let it drop.
pub struct UnprotectedKey {
    key_pair: Secp256k1KeyPair,
}

impl UnprotectedKey {
    /// Sign a 32-byte prehash with the decrypted key.
    pub fn sign_prehash(&self, prehash: &Hash) -> Result<Secp256k1Signature, CryptoError> {
        self.key_pair.sign_prehash(prehash)
    }

    /// Address of the decrypted key.
    pub fn address(&self) -> Address {
        self.key_pair.address()
    }
}

impl std::fmt::Debug for UnprotectedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnprotectedKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::recover_address;
    use crate::hashing::keccak256;

    #[test]
    fn test_protect_unprotect_roundtrip() {
        let secret = [0x46u8; 32];
        let expected = Secp256k1KeyPair::from_bytes(&secret).unwrap().address();

        let protected = ProtectedKey::new(&secret).unwrap();
        assert_eq!(protected.address(), expected);

        let unprotected = protected.unprotect().unwrap();
        assert_eq!(unprotected.address(), expected);
    }

    #[test]
    fn test_ciphertext_does_not_contain_secret() {
        let secret = [0x46u8; 32];
        let protected = ProtectedKey::new(&secret).unwrap();

        assert!(!protected
            .ciphertext
            .windows(secret.len())
            .any(|window| window == secret));
    }

    #[test]
    fn test_unprotected_key_signs() {
        let protected = ProtectedKey::generate().unwrap();
        let digest = keccak256(b"seal");

        let signature = protected.unprotect().unwrap().sign_prehash(&digest).unwrap();
        assert_eq!(recover_address(&digest, &signature).unwrap(), protected.address());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut protected = ProtectedKey::generate().unwrap();
        protected.ciphertext[0] ^= 0xFF;

        assert!(matches!(
            protected.unprotect(),
            Err(CryptoError::UnprotectionFailed(_))
        ));
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert_eq!(
            ProtectedKey::from_slice(&[0x11u8; 16]).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_invalid_scalar_rejected() {
        assert!(matches!(
            ProtectedKey::new(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let protected = ProtectedKey::new(&[0x46u8; 32]).unwrap();
        let rendered = format!("{:?} {:?}", protected, protected.unprotect().unwrap());

        assert!(rendered.contains("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"));
        assert!(!rendered.contains("4646464646464646"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_independent_entropy_per_key() {
        let a = ProtectedKey::new(&[0x46u8; 32]).unwrap();
        let b = ProtectedKey::new(&[0x46u8; 32]).unwrap();

        assert_eq!(a.address(), b.address());
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
