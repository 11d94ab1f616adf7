//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable ECDSA over 32-byte prehashes, Ethereum style.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2), recovery id adjusted accordingly
//! - Secret scalars are zeroized when a [`Secp256k1KeyPair`] is dropped
//!
//! Callers hash first (Keccak-256) and sign the digest; nothing in this
//! module hashes a message on the caller's behalf.

use crate::hashing::{keccak256, Hash};
use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::PrehashVerifier, RecoveryId, Signature, SigningKey, VerifyingKey,
};

/// 20-byte Ethereum address.
pub type Address = [u8; 20];

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let encoded = key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(encoded.as_bytes());
        Self(bytes)
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Ethereum address: last 20 bytes of keccak256(uncompressed x || y).
    pub fn address(&self) -> Result<Address, CryptoError> {
        Ok(address_of(&self.verifying_key()?))
    }

    /// Verify a signature over a 32-byte prehash.
    pub fn verify_prehash(
        &self,
        prehash: &Hash,
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let sig = signature.to_k256()?;
        self.verifying_key()?
            .verify_prehash(prehash, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Recoverable ECDSA signature: `r`, `s` and the raw recovery id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature {
    r: [u8; 32],
    s: [u8; 32],
    recovery_id: u8,
}

impl Secp256k1Signature {
    /// Assemble from components. The recovery id is checked when the
    /// signature is used, not here.
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Big-endian `r`.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Big-endian `s`.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Raw recovery id as produced by the curve operation (0..=3, almost always 0 or 1).
    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    /// 65-byte `r || s || recovery_id` encoding.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.recovery_id;
        bytes
    }

    fn to_k256(self) -> Result<Signature, CryptoError> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        Signature::from_slice(&rs).map_err(|_| CryptoError::InvalidSignature)
    }
}

/// secp256k1 ECDSA keypair.
///
/// The underlying `SigningKey` zeroizes its scalar on drop.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes. Borrowed so no extra copy of the
    /// secret is left on the caller's stack.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes(bytes.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Ethereum address of this keypair.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte prehash (deterministic RFC 6979, low-S).
    pub fn sign_prehash(&self, prehash: &Hash) -> Result<Secp256k1Signature, CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let bytes: [u8; 64] = sig.to_bytes().into();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(Secp256k1Signature::new(r, s, recovery_id.to_byte()))
    }
}

/// Recover the public key that produced `signature` over `prehash`.
pub fn recover_public_key(
    prehash: &Hash,
    signature: &Secp256k1Signature,
) -> Result<Secp256k1PublicKey, CryptoError> {
    let recovery_id = RecoveryId::from_byte(signature.recovery_id)
        .ok_or(CryptoError::InvalidRecoveryId(signature.recovery_id))?;
    let sig = signature.to_k256()?;

    let key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(Secp256k1PublicKey::from_verifying_key(&key))
}

/// Recover the signer's Ethereum address.
pub fn recover_address(
    prehash: &Hash,
    signature: &Secp256k1Signature,
) -> Result<Address, CryptoError> {
    recover_public_key(prehash, signature)?.address()
}

fn address_of(key: &VerifyingKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    // Skip the 0x04 prefix
    let hash = keccak256(&uncompressed.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}
