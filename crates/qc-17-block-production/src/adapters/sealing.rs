//! Assemble-and-Seal Production Step
//!
//! Default [`ProductionStep`]: take the current head, ask the assembler for
//! a candidate on top of it, seal it with the node's [`Signer`] and hand the
//! result downstream.

use crate::domain::{CandidateBlock, SealedBlock};
use crate::error::{BlockProductionError, Result};
use crate::metrics::Metrics;
use crate::ports::outbound::{BlockAssembler, BlockSink, BlockTree, ProductionStep, Sealer};
use crate::signer::Signer;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Seals candidates by signing their header hash.
pub struct SignerSealer {
    signer: Arc<Signer>,
}

impl SignerSealer {
    /// Seal with `signer`
    pub fn new(signer: Arc<Signer>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl Sealer for SignerSealer {
    async fn seal(&self, block: CandidateBlock) -> Result<SealedBlock> {
        let hash = block.header_hash();
        let (seal, author) = self.signer.sign_for_seal(hash)?;
        Ok(SealedBlock {
            header: block,
            hash,
            seal,
            author,
        })
    }

    fn can_seal(&self) -> bool {
        self.signer.can_sign()
    }
}

/// Production step composed of an assembler, a sealer and a sink.
pub struct SealingProductionStep {
    assembler: Arc<dyn BlockAssembler>,
    sealer: Arc<dyn Sealer>,
    sink: Arc<dyn BlockSink>,
    block_tree: Arc<dyn BlockTree>,
    metrics: Arc<Metrics>,
}

impl SealingProductionStep {
    /// Wire up the step's collaborators
    pub fn new(
        assembler: Arc<dyn BlockAssembler>,
        sealer: Arc<dyn Sealer>,
        sink: Arc<dyn BlockSink>,
        block_tree: Arc<dyn BlockTree>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            assembler,
            sealer,
            sink,
            block_tree,
            metrics,
        }
    }
}

#[async_trait]
impl ProductionStep for SealingProductionStep {
    async fn produce(&self, cancel: &CancellationToken) -> Result<()> {
        // Assembling work that can never be sealed would only waste it.
        if !self.sealer.can_seal() {
            return Err(BlockProductionError::SignerNotConfigured);
        }

        let parent = self.block_tree.head_hash();
        let candidate = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BlockProductionError::Cancelled),
            candidate = self.assembler.prepare_block(parent) => candidate?,
        };
        debug!(
            number = candidate.number,
            transactions = candidate.transaction_count,
            "[sealing] Candidate assembled"
        );

        let sealed = self.sealer.seal(candidate).await?;
        let (number, hash, author) = (sealed.header.number, sealed.hash, sealed.author);

        self.sink.on_block_produced(sealed).await?;
        self.metrics.record_block_produced();
        info!("[sealing] Produced block #{} {:?} by {:?}", number, hash, author);
        Ok(())
    }
}
