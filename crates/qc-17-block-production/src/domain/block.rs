//! Block identities and the candidate → sealed hand-off.

use super::transaction::Signature;
use primitive_types::{H160 as Address, H256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use shared_crypto::keccak256;

/// Identity of a block as announced by the chain head tracker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block hash
    pub hash: H256,
    /// Block number
    pub number: u64,
}

/// Assembled but unsealed block header
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBlock {
    /// Parent block hash (zero for genesis children with no head yet)
    pub parent_hash: H256,
    /// Block number
    pub number: u64,
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Root over the included transactions
    pub transactions_root: H256,
    /// Number of included transactions
    pub transaction_count: u32,
}

impl CandidateBlock {
    /// Hash the seal signs over: keccak256(rlp(header fields)).
    pub fn header_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(6);
        stream.append(&self.parent_hash);
        stream.append(&self.number);
        stream.append(&self.timestamp);
        stream.append(&self.gas_limit);
        stream.append(&self.transactions_root);
        stream.append(&self.transaction_count);
        H256(keccak256(&stream.out()))
    }
}

/// Candidate plus its producer seal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlock {
    /// The header that was sealed
    pub header: CandidateBlock,
    /// `header.header_hash()` at sealing time
    pub hash: H256,
    /// Signature over `hash`, `v` = raw recovery id
    pub seal: Signature,
    /// Address of the key that produced `seal`
    pub author: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateBlock {
        CandidateBlock {
            parent_hash: H256::repeat_byte(0x11),
            number: 42,
            timestamp: 1_700_000_000,
            gas_limit: 30_000_000,
            transactions_root: H256::zero(),
            transaction_count: 0,
        }
    }

    #[test]
    fn test_header_hash_deterministic() {
        assert_eq!(candidate().header_hash(), candidate().header_hash());
    }

    #[test]
    fn test_header_hash_covers_parent() {
        let mut other = candidate();
        other.parent_hash = H256::repeat_byte(0x22);
        assert_ne!(candidate().header_hash(), other.header_hash());
    }
}
