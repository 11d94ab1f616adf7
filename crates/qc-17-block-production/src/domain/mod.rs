//! Domain layer for block production
//!
//! Pure logic with no runtime dependencies:
//! - [`transaction`]: legacy transactions, EIP-155 signing payload and `v` encoding
//! - [`block`]: candidate/sealed block headers
//! - [`readiness`]: the lock-free readiness gate

pub mod block;
pub mod readiness;
pub mod transaction;

pub use block::{BlockRef, CandidateBlock, SealedBlock};
pub use readiness::ReadinessGate;
pub use transaction::{decode_eip155_v, eip155_v, Signature, Transaction, EIP155_V_OFFSET};
