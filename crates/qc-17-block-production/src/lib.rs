//! # Quantum Chain - Block Production Core (Subsystem 17)
//!
//! **Bounded Context:** Block Production Scheduling & Sealing
//! **Architecture Compliance:** DDD + Hexagonal + TDD
//!
//! ## Purpose
//!
//! Decides *when* the node may build a block and signs what gets built:
//! - A lock-free readiness gate fed by the block-processing queue and the
//!   block tree, so production never starts while the local chain is still
//!   catching up
//! - A cancellable production loop that runs one pluggable production step
//!   per eligible iteration and stops for good on the first real failure
//! - A signer holding the producer key encrypted in memory, sealing block
//!   headers and signing transactions with EIP-155 replay protection
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Adapters (Outer)                                   │
//! │  - InMemoryProcessingQueue / InMemoryBlockTree      │
//! │  - SignerSealer, SealingProductionStep              │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports (Middle)                                     │
//! │  - Inbound: BlockProducer (start/stop)              │
//! │  - Outbound: queue, tree, step, assembler, sealer   │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (Inner - Pure Logic)                        │
//! │  - ReadinessGate                                    │
//! │  - Transaction / Signature (EIP-155)                │
//! │  - CandidateBlock / SealedBlock                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Critical Invariants
//!
//! 1. **No production while not ready**: gate closed or queue non-empty means wait
//! 2. **Fail-fast**: a step error ends the loop after one failed-seal count
//! 3. **Silent cancellation**: stopping is never logged or counted as a failure
//! 4. **Replay protection**: `v = recovery_id + 35 + 2 * chain_id`
//! 5. **Key isolation**: rotating the key never corrupts an in-flight signature
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let metrics = Arc::new(Metrics::new());
//! let signer = Arc::new(Signer::new(config.chain_id, config.load_signer_key()?));
//! let step = SealingProductionStep::new(
//!     assembler,
//!     Arc::new(SignerSealer::new(signer)),
//!     sink,
//!     tree.clone(),
//!     metrics.clone(),
//! );
//! let producer = LoopBlockProducer::new(&config, queue, tree, Arc::new(step), metrics)?;
//!
//! producer.start().await?;
//! // ...
//! producer.stop().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Collaborator and production step adapters
pub mod adapters;
/// Domain models and business logic
pub mod domain;
pub mod ports;
pub mod service;
pub mod signer;

mod config;
mod error;
mod metrics;

pub use config::{load_protected_key, BlockProductionConfig};
pub use error::{BlockProductionError, Result};
pub use metrics::Metrics;

pub use domain::{
    decode_eip155_v, eip155_v, BlockRef, CandidateBlock, ReadinessGate, SealedBlock, Signature,
    Transaction,
};

pub use ports::{
    BlockAssembler, BlockProcessingQueue, BlockProducer, BlockSink, BlockTree, ProductionStep,
    Sealer,
};

pub use adapters::{InMemoryBlockTree, InMemoryProcessingQueue, SealingProductionStep, SignerSealer};
pub use service::LoopBlockProducer;
pub use signer::Signer;

pub use shared_crypto::ProtectedKey;

/// Subsystem identifier
pub const SUBSYSTEM_ID: u8 = 17;

/// Chain id used when none is configured (Ethereum mainnet)
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// How long the loop waits before re-checking readiness (milliseconds)
pub const CHAIN_NOT_YET_PROCESSED_DELAY_MS: u64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 17);
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_CHAIN_ID, 1);
        assert_eq!(CHAIN_NOT_YET_PROCESSED_DELAY_MS, 100);
    }
}
