//! Block and transaction signer
//!
//! Holds at most one [`ProtectedKey`] and signs with a per-call snapshot of
//! it: a call clones the `Arc` under a short read lock, unprotects outside
//! the lock, and drops the plaintext guard before returning. Replacing the
//! key never disturbs a call that already took its snapshot, and once the
//! last such call finishes the old key is dropped (and wiped).

use crate::domain::{eip155_v, Signature, Transaction};
use crate::error::{BlockProductionError, Result};
use parking_lot::RwLock;
use primitive_types::{H160 as Address, H256};
use shared_crypto::ProtectedKey;
use std::sync::Arc;
use tracing::info;

/// Signer with chain-id-aware transaction signing and hot key rotation.
pub struct Signer {
    chain_id: u64,
    key: RwLock<Option<Arc<ProtectedKey>>>,
}

impl Signer {
    /// Create a signer for `chain_id`, optionally with a key already configured.
    pub fn new(chain_id: u64, key: Option<ProtectedKey>) -> Self {
        let signer = Self {
            chain_id,
            key: RwLock::new(None),
        };
        signer.set_signer(key);
        signer
    }

    /// Create a signer from a raw 32-byte secret, protecting it immediately.
    pub fn from_secret(chain_id: u64, secret: &[u8; 32]) -> Result<Self> {
        Ok(Self::new(chain_id, Some(ProtectedKey::new(secret)?)))
    }

    /// Chain id used for replay protection.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Whether a key is configured.
    pub fn can_sign(&self) -> bool {
        self.key.read().is_some()
    }

    /// Address of the active key, or the zero address when none is configured.
    pub fn address(&self) -> Address {
        self.key
            .read()
            .as_ref()
            .map(|key| Address(key.address()))
            .unwrap_or_else(Address::zero)
    }

    /// Replace (or clear, with `None`) the active key.
    pub fn set_signer(&self, key: Option<ProtectedKey>) {
        let key = key.map(Arc::new);
        let address = key.as_ref().map(|key| Address(key.address()));

        // The previous key drops here, outside the lock, unless an
        // in-flight call still holds its snapshot.
        let _previous = std::mem::replace(&mut *self.key.write(), key);

        match address {
            Some(address) => info!(
                "[signer] Address {:?} is configured for signing blocks.",
                address
            ),
            None => info!("[signer] No address is configured for signing blocks."),
        }
    }

    fn snapshot(&self) -> Result<Arc<ProtectedKey>> {
        self.key
            .read()
            .clone()
            .ok_or(BlockProductionError::SignerNotConfigured)
    }

    /// Sign a 256-bit digest. `v` is the raw recovery id.
    pub fn sign(&self, digest: H256) -> Result<Signature> {
        self.sign_for_seal(digest).map(|(signature, _)| signature)
    }

    /// Sign a digest and report which address signed it.
    ///
    /// Both come from the same key snapshot, so they agree even if the key
    /// is rotated concurrently.
    pub fn sign_for_seal(&self, digest: H256) -> Result<(Signature, Address)> {
        let key = self.snapshot()?;
        let unprotected = key.unprotect()?;
        let signature = unprotected.sign_prehash(digest.as_fixed_bytes())?;
        Ok((signature.into(), Address(key.address())))
    }

    /// Sign `tx` for this signer's chain and attach the signature.
    ///
    /// `tx` is left untouched on failure.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<()> {
        let digest = tx.signing_hash(self.chain_id);
        let signature = replay_protected(self.sign(digest)?, self.chain_id)?;
        tx.signature = Some(signature);
        Ok(())
    }
}

/// Rewrite a raw-recovery-id signature into its EIP-155 form for `chain_id`.
fn replay_protected(mut signature: Signature, chain_id: u64) -> Result<Signature> {
    let recovery_id = match signature.v {
        0 | 1 => signature.v as u8,
        other => {
            return Err(BlockProductionError::Encoding(format!(
                "recovery id {} cannot be EIP-155 encoded",
                other
            )))
        }
    };
    signature.v = eip155_v(recovery_id, chain_id).ok_or_else(|| {
        BlockProductionError::Encoding(format!("chain id {} overflows EIP-155 v", chain_id))
    })?;
    Ok(signature)
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address())
            .finish()
    }
}
