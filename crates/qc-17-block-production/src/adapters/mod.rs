//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for the producer:
//! - [`memory`]: in-memory processing queue and block tree
//! - [`sealing`]: signer-backed sealer and the default production step

pub mod memory;
pub mod sealing;

pub use memory::{InMemoryBlockTree, InMemoryProcessingQueue};
pub use sealing::{SealingProductionStep, SignerSealer};
