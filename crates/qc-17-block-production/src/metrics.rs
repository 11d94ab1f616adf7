//! Metrics collection for block production subsystem

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for block production
#[derive(Debug, Default)]
pub struct Metrics {
    /// Production steps that failed with a non-cancellation error
    pub failed_block_seals: AtomicU64,

    /// Blocks sealed and handed downstream
    pub blocks_produced: AtomicU64,

    /// Readiness gate mirror (1 = may produce)
    pub can_produce_blocks: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed production step
    pub fn record_failed_seal(&self) {
        self.failed_block_seals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a produced block
    pub fn record_block_produced(&self) {
        self.blocks_produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Mirror the readiness gate
    pub fn set_can_produce_blocks(&self, can_produce: bool) {
        self.can_produce_blocks
            .store(can_produce as u64, Ordering::Relaxed);
    }

    /// Get failed seals
    pub fn get_failed_block_seals(&self) -> u64 {
        self.failed_block_seals.load(Ordering::Relaxed)
    }

    /// Get blocks produced
    pub fn get_blocks_produced(&self) -> u64 {
        self.blocks_produced.load(Ordering::Relaxed)
    }

    /// Get readiness gauge
    pub fn get_can_produce_blocks(&self) -> u64 {
        self.can_produce_blocks.load(Ordering::Relaxed)
    }
}
