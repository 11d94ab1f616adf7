//! Legacy transactions and their EIP-155 replay-protected signatures.
//!
//! Two encodings matter here:
//!
//! - **signing payload**: `rlp([nonce, gas_price, gas_limit, to, value, data,
//!   chain_id, 0, 0])`. Signature fields are omitted and the chain id sits
//!   where `v` will go; its Keccak-256 is the digest that gets signed.
//! - **signed encoding**: `rlp([nonce, gas_price, gas_limit, to, value, data,
//!   v, r, s])` with `v = recovery_id + 35 + 2 * chain_id`.

use crate::error::{BlockProductionError, Result};
use primitive_types::{H160 as Address, H256, U256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use shared_crypto::{keccak256, recover_address, Secp256k1Signature};

/// Offset added to the raw recovery id for replay-protected signatures.
pub const EIP155_V_OFFSET: u64 = 35;

/// ECDSA signature with an Ethereum `v`.
///
/// For raw digest signing `v` is the recovery id; once attached to a
/// transaction it carries the EIP-155 encoding instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// `r` scalar
    pub r: U256,
    /// `s` scalar (low-S)
    pub s: U256,
    /// recovery id or EIP-155 encoded `v`
    pub v: u64,
}

impl Signature {
    /// 65-byte `r || s || recovery_id` form, whichever form `v` is in.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        self.r.to_big_endian(&mut bytes[..32]);
        self.s.to_big_endian(&mut bytes[32..64]);
        bytes[64] = self.recovery_id();
        bytes
    }

    /// Raw recovery id, whichever form `v` is in.
    pub fn recovery_id(&self) -> u8 {
        match decode_eip155_v(self.v) {
            Some((recovery_id, _)) => recovery_id,
            None if self.v >= 27 => (self.v - 27) as u8,
            None => self.v as u8,
        }
    }

    /// Chain id carried by an EIP-155 `v`, if any.
    pub fn chain_id(&self) -> Option<u64> {
        decode_eip155_v(self.v).map(|(_, chain_id)| chain_id)
    }

    pub(crate) fn to_secp256k1(self) -> Secp256k1Signature {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        self.r.to_big_endian(&mut r);
        self.s.to_big_endian(&mut s);
        Secp256k1Signature::new(r, s, self.recovery_id())
    }
}

impl From<Secp256k1Signature> for Signature {
    fn from(sig: Secp256k1Signature) -> Self {
        Self {
            r: U256::from_big_endian(sig.r()),
            s: U256::from_big_endian(sig.s()),
            v: sig.recovery_id() as u64,
        }
    }
}

/// `v = recovery_id + 35 + 2 * chain_id`.
///
/// `None` on overflow, or when `recovery_id` is not 0 or 1: the x-reduced
/// ids 2 and 3 would decode back as a different chain.
pub fn eip155_v(recovery_id: u8, chain_id: u64) -> Option<u64> {
    if recovery_id > 1 {
        return None;
    }
    chain_id
        .checked_mul(2)?
        .checked_add(EIP155_V_OFFSET)?
        .checked_add(recovery_id as u64)
}

/// Invert [`eip155_v`]: `recovery_id = (v - 35) mod 2`, `chain_id = (v - 35 - recovery_id) / 2`.
pub fn decode_eip155_v(v: u64) -> Option<(u8, u64)> {
    let shifted = v.checked_sub(EIP155_V_OFFSET)?;
    let recovery_id = (shifted % 2) as u8;
    Some((recovery_id, (shifted - recovery_id as u64) / 2))
}

/// Legacy (pre-typed-envelope) transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender nonce
    pub nonce: U256,
    /// Gas price in wei
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: U256,
    /// Recipient; `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Call data / init code
    pub data: Vec<u8>,
    /// Attached signature, `v` EIP-155 encoded
    pub signature: Option<Signature>,
}

impl Transaction {
    fn append_unsigned_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// Pre-signature encoding: no signature fields, chain id in their place.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_unsigned_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        stream.out().to_vec()
    }

    /// Digest a replay-protected signature commits to.
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        H256(keccak256(&self.signing_payload(chain_id)))
    }

    /// Signed encoding. Fails if no signature is attached.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let signature = self.signature.ok_or_else(|| {
            BlockProductionError::Encoding("transaction is not signed".to_string())
        })?;

        let mut stream = RlpStream::new_list(9);
        self.append_unsigned_fields(&mut stream);
        stream.append(&signature.v);
        stream.append(&signature.r);
        stream.append(&signature.s);
        Ok(stream.out().to_vec())
    }

    /// Recover the sender, checking the signature was made for `chain_id`.
    pub fn recover_sender(&self, chain_id: u64) -> Result<Address> {
        let signature = self.signature.ok_or_else(|| {
            BlockProductionError::Encoding("transaction is not signed".to_string())
        })?;
        match signature.chain_id() {
            Some(signed_for) if signed_for == chain_id => {}
            other => {
                return Err(BlockProductionError::Encoding(format!(
                    "signature is for chain {:?}, expected {}",
                    other, chain_id
                )))
            }
        }

        let digest = self.signing_hash(chain_id);
        let sender = recover_address(digest.as_fixed_bytes(), &signature.to_secp256k1())?;
        Ok(Address(sender))
    }
}
