//! Readiness Gate
//!
//! A single flag answering "is the local chain caught up enough to build on".
//! Two notification sources write it, the production loop reads it:
//!
//! | Signal | Effect |
//! |--------|--------|
//! | processing queue became empty | open |
//! | new best suggested block == canonical head | open |
//! | new best suggested block != canonical head | close |
//!
//! Every write is an absolute `swap`, never read-modify-write, so concurrent
//! writers cannot corrupt the flag: the last applied write wins. The reader
//! tolerates one poll interval of staleness.

use crate::metrics::Metrics;
use primitive_types::H256;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Lock-free readiness flag shared by the notification handlers and the loop.
#[derive(Debug)]
pub struct ReadinessGate {
    can_produce: AtomicBool,
    metrics: Arc<Metrics>,
}

impl ReadinessGate {
    /// Closed until the first signal opens it.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        metrics.set_can_produce_blocks(false);
        Self {
            can_produce: AtomicBool::new(false),
            metrics,
        }
    }

    /// Sampled once per loop iteration.
    pub(crate) fn can_produce(&self) -> bool {
        self.can_produce.load(Ordering::Acquire)
    }

    fn set(&self, can_produce: bool) -> bool {
        let previous = self.can_produce.swap(can_produce, Ordering::AcqRel);
        self.metrics.set_can_produce_blocks(can_produce);
        previous
    }

    /// Close the gate until a fresh signal arrives.
    ///
    /// Used when listeners are (re)registered: signals missed while nobody
    /// was listening must not leave a stale "ready" behind.
    pub(crate) fn reset(&self) {
        let previous = self.set(false);
        trace!(previous, "[readiness] Gate reset, waiting for a readiness signal");
    }

    /// The block processing queue drained: unconditionally allow production.
    pub fn on_queue_became_empty(&self) {
        let previous = self.set(true);
        trace!(previous, "[readiness] Can produce blocks, processing queue is empty");
    }

    /// A new best block was suggested. Production is allowed only if it is
    /// already the canonical head; otherwise processing is still catching up.
    ///
    /// Returns the new gate value.
    pub fn on_new_best_suggested_block(&self, candidate: H256, canonical_head: Option<H256>) -> bool {
        let caught_up = canonical_head == Some(candidate);
        let previous = self.set(caught_up);
        if caught_up {
            trace!(
                previous,
                ?candidate,
                "[readiness] Can produce blocks, new best suggested block is already processed"
            );
        } else {
            trace!(
                previous,
                ?candidate,
                ?canonical_head,
                "[readiness] Can not produce a block, new best suggested block not processed yet"
            );
        }
        caught_up
    }
}
