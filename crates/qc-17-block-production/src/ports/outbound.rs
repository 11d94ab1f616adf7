//! Outbound ports (driven side - SPI)
//!
//! Collaborators the production core consumes. Notifications are delivered
//! over `broadcast` channels: subscribing on start is registration, dropping
//! the receiver on stop is unregistration.

use crate::domain::{BlockRef, CandidateBlock, SealedBlock};
use crate::error::Result;
use async_trait::async_trait;
use primitive_types::H256;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Port: the chain-processing queue
pub trait BlockProcessingQueue: Send + Sync {
    /// Blocks waiting to be processed
    fn count(&self) -> usize;

    /// Whether nothing is waiting to be processed
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Fires each time the queue transitions to zero pending items
    fn subscribe_queue_empty(&self) -> broadcast::Receiver<()>;
}

/// Port: the chain head tracker (block tree)
pub trait BlockTree: Send + Sync {
    /// Hash of the current canonical head, if any
    fn head_hash(&self) -> Option<H256>;

    /// Fires with each new best suggested block
    fn subscribe_new_best_suggested(&self) -> broadcast::Receiver<BlockRef>;
}

/// Port: one production attempt
///
/// The scheduling loop is fixed; engines plug in here. Returning
/// `BlockProductionError::Cancelled` ends the loop quietly, any other error
/// ends it as a failure.
#[async_trait]
pub trait ProductionStep: Send + Sync {
    /// Produce (at most) one block
    async fn produce(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Port: candidate block assembly (transaction selection, execution)
#[async_trait]
pub trait BlockAssembler: Send + Sync {
    /// Build a candidate on top of `parent` (None when there is no head yet)
    async fn prepare_block(&self, parent: Option<H256>) -> Result<CandidateBlock>;
}

/// Port: seal a candidate
#[async_trait]
pub trait Sealer: Send + Sync {
    /// Produce the seal for `block`
    async fn seal(&self, block: CandidateBlock) -> Result<SealedBlock>;

    /// Whether a seal can currently be produced
    fn can_seal(&self) -> bool;
}

/// Port: where sealed blocks go (processing, broadcast)
#[async_trait]
pub trait BlockSink: Send + Sync {
    /// Accept a freshly sealed block
    async fn on_block_produced(&self, block: SealedBlock) -> Result<()>;
}
