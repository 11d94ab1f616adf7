//! In-Memory Chain Collaborators
//!
//! Implements `BlockProcessingQueue` and `BlockTree` without a real chain
//! behind them. Useful for tests and for wiring the producer before the
//! processing pipeline exists.

use crate::domain::BlockRef;
use crate::ports::outbound::{BlockProcessingQueue, BlockTree};
use parking_lot::RwLock;
use primitive_types::H256;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Notifications buffered per subscriber before it starts lagging.
const NOTIFICATION_CAPACITY: usize = 64;

/// Counter-backed processing queue.
pub struct InMemoryProcessingQueue {
    pending: AtomicUsize,
    emptied: broadcast::Sender<()>,
}

impl InMemoryProcessingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (emptied, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            pending: AtomicUsize::new(0),
            emptied,
        }
    }

    /// A block was queued for processing. Returns the new count.
    pub fn enqueue(&self) -> usize {
        self.pending.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// A queued block finished processing. Returns the new count.
    ///
    /// Subscribers are notified when this empties the queue.
    pub fn complete_one(&self) -> usize {
        let previous = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);

        if previous == 1 {
            // No receivers is fine: nobody is waiting on the queue.
            let _ = self.emptied.send(());
            trace!("[queue] Processing queue became empty");
        }
        previous.saturating_sub(1)
    }
}

impl Default for InMemoryProcessingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockProcessingQueue for InMemoryProcessingQueue {
    fn count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn subscribe_queue_empty(&self) -> broadcast::Receiver<()> {
        self.emptied.subscribe()
    }
}

/// Block tree that only tracks a head and forwards suggestions.
pub struct InMemoryBlockTree {
    head: RwLock<Option<BlockRef>>,
    best_suggested: broadcast::Sender<BlockRef>,
}

impl InMemoryBlockTree {
    /// Create a tree with no head.
    pub fn new() -> Self {
        let (best_suggested, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            head: RwLock::new(None),
            best_suggested,
        }
    }

    /// Adopt `block` as the canonical head.
    pub fn set_head(&self, block: BlockRef) {
        *self.head.write() = Some(block);
    }

    /// Current head, if any.
    pub fn head(&self) -> Option<BlockRef> {
        *self.head.read()
    }

    /// Announce a new best suggested block.
    pub fn suggest(&self, block: BlockRef) {
        let _ = self.best_suggested.send(block);
        trace!(number = block.number, hash = ?block.hash, "[tree] New best suggested block");
    }
}

impl Default for InMemoryBlockTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTree for InMemoryBlockTree {
    fn head_hash(&self) -> Option<H256> {
        self.head.read().map(|head| head.hash)
    }

    fn subscribe_new_best_suggested(&self) -> broadcast::Receiver<BlockRef> {
        self.best_suggested.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_counts() {
        let queue = InMemoryProcessingQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.enqueue(), 1);
        assert_eq!(queue.enqueue(), 2);
        assert_eq!(queue.complete_one(), 1);
        assert_eq!(queue.count(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_complete_on_empty_queue_is_noop() {
        let queue = InMemoryProcessingQueue::new();
        let mut rx = queue.subscribe_queue_empty();
        assert_eq!(queue.complete_one(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_queue_notifies_only_on_transition_to_empty() {
        let queue = InMemoryProcessingQueue::new();
        let mut rx = queue.subscribe_queue_empty();

        queue.enqueue();
        queue.enqueue();
        queue.complete_one();
        assert!(rx.try_recv().is_err());

        queue.complete_one();
        assert_eq!(rx.try_recv(), Ok(()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_block_tree_head_and_suggestions() {
        let tree = InMemoryBlockTree::new();
        let mut rx = tree.subscribe_new_best_suggested();
        assert_eq!(tree.head_hash(), None);

        let block = BlockRef {
            hash: H256::repeat_byte(3),
            number: 3,
        };
        tree.set_head(block);
        tree.suggest(block);

        assert_eq!(tree.head_hash(), Some(block.hash));
        assert_eq!(tree.head(), Some(block));
        assert_eq!(rx.try_recv(), Ok(block));
    }
}
