//! # Producer Lifecycle Integration Tests
//!
//! Drives the full stack through its public API: a producer built from a
//! JSON config and key file, readiness signals from the in-memory queue and
//! block tree, and the default assemble-and-seal step feeding a sink that
//! imports each sealed block as the new head.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::{H160, H256};
use qc_17_block_production::{
    BlockAssembler, BlockProducer, BlockProductionConfig, BlockProductionError, BlockRef,
    BlockSink, BlockTree, CandidateBlock, InMemoryBlockTree, InMemoryProcessingQueue,
    LoopBlockProducer, Metrics, Result, SealedBlock, SealingProductionStep, Signer, SignerSealer,
};
use shared_crypto::{recover_address, Secp256k1Signature};
use tokio::time::timeout;

const SIGNER_KEY_HEX: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";

/// Builds on whatever parent it is handed.
struct ChainAssembler {
    tree: Arc<InMemoryBlockTree>,
}

#[async_trait]
impl BlockAssembler for ChainAssembler {
    async fn prepare_block(&self, parent: Option<H256>) -> Result<CandidateBlock> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let number = self.tree.head().map(|head| head.number + 1).unwrap_or(0);
        Ok(CandidateBlock {
            parent_hash: parent.unwrap_or_default(),
            number,
            timestamp: 1_700_000_000 + number,
            gas_limit: 30_000_000,
            transactions_root: H256::zero(),
            transaction_count: 0,
        })
    }
}

/// Imports every sealed block as the new canonical head.
struct ImportingSink {
    tree: Arc<InMemoryBlockTree>,
    imported: Mutex<Vec<SealedBlock>>,
}

#[async_trait]
impl BlockSink for ImportingSink {
    async fn on_block_produced(&self, block: SealedBlock) -> Result<()> {
        self.tree.set_head(BlockRef {
            hash: block.hash,
            number: block.header.number,
        });
        self.imported.lock().push(block);
        Ok(())
    }
}

struct Node {
    queue: Arc<InMemoryProcessingQueue>,
    tree: Arc<InMemoryBlockTree>,
    sink: Arc<ImportingSink>,
    signer: Arc<Signer>,
    metrics: Arc<Metrics>,
    producer: LoopBlockProducer,
    _key_dir: tempfile::TempDir,
}

fn node() -> Node {
    let key_dir = tempfile::tempdir().unwrap();
    let key_path = key_dir.path().join("signer.key");
    let mut key_file = std::fs::File::create(&key_path).unwrap();
    writeln!(key_file, "{}", SIGNER_KEY_HEX).unwrap();

    let config: BlockProductionConfig = serde_json::from_value(serde_json::json!({
        "name": "integration",
        "chain_id": 1,
        "readiness_poll_interval_ms": 10,
        "signer_key_path": key_path,
    }))
    .unwrap();

    let queue = Arc::new(InMemoryProcessingQueue::new());
    let tree = Arc::new(InMemoryBlockTree::new());
    let metrics = Arc::new(Metrics::new());
    let signer = Arc::new(Signer::new(
        config.chain_id,
        config.load_signer_key().unwrap(),
    ));
    let sink = Arc::new(ImportingSink {
        tree: Arc::clone(&tree),
        imported: Mutex::new(Vec::new()),
    });

    let step = SealingProductionStep::new(
        Arc::new(ChainAssembler {
            tree: Arc::clone(&tree),
        }),
        Arc::new(SignerSealer::new(Arc::clone(&signer))),
        sink.clone(),
        tree.clone(),
        Arc::clone(&metrics),
    );
    let producer = LoopBlockProducer::new(
        &config,
        queue.clone(),
        tree.clone(),
        Arc::new(step),
        Arc::clone(&metrics),
    )
    .unwrap();

    Node {
        queue,
        tree,
        sink,
        signer,
        metrics,
        producer,
        _key_dir: key_dir,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn seal_signer(block: &SealedBlock) -> H160 {
    let bytes = block.seal.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..64]);
    let signature = Secp256k1Signature::new(r, s, block.seal.recovery_id());
    H160(recover_address(block.hash.as_fixed_bytes(), &signature).unwrap())
}

#[tokio::test]
async fn test_start_produce_stop() {
    let node = node();
    assert_eq!(
        hex::encode(node.signer.address()),
        "9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
    );

    node.producer.start().await.unwrap();
    assert!(node.producer.is_running());

    // Gate opens once the processing backlog drains.
    node.queue.enqueue();
    node.queue.complete_one();

    let sink = Arc::clone(&node.sink);
    wait_until(move || sink.imported.lock().len() >= 3).await;

    timeout(Duration::from_secs(1), node.producer.stop())
        .await
        .expect("stop should not hang")
        .unwrap();
    assert!(!node.producer.is_running());

    let imported = node.sink.imported.lock();
    assert_eq!(node.metrics.get_blocks_produced(), imported.len() as u64);
    assert_eq!(node.metrics.get_failed_block_seals(), 0);

    for (i, block) in imported.iter().enumerate() {
        assert_eq!(block.header.number, i as u64);
        assert_eq!(block.hash, block.header.header_hash());
        assert_eq!(block.author, node.signer.address());
        assert_eq!(seal_signer(block), block.author);
    }
    for pair in imported.windows(2) {
        assert_eq!(pair[1].header.parent_hash, pair[0].hash);
    }
    assert_eq!(
        node.tree.head_hash(),
        imported.last().map(|block| block.hash)
    );
}

#[tokio::test]
async fn test_production_waits_for_head_to_catch_up() {
    let node = node();
    node.producer.start().await.unwrap();

    // A better block was suggested but the head has not adopted it yet.
    node.tree.set_head(BlockRef {
        hash: H256::repeat_byte(1),
        number: 1,
    });
    node.tree.suggest(BlockRef {
        hash: H256::repeat_byte(2),
        number: 2,
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(node.sink.imported.lock().is_empty());

    // Processing catches up: the suggestion becomes the head.
    let caught_up = BlockRef {
        hash: H256::repeat_byte(2),
        number: 2,
    };
    node.tree.set_head(caught_up);
    node.tree.suggest(caught_up);

    let sink = Arc::clone(&node.sink);
    wait_until(move || !sink.imported.lock().is_empty()).await;
    node.producer.stop().await.unwrap();

    let imported = node.sink.imported.lock();
    assert_eq!(imported[0].header.parent_hash, caught_up.hash);
    assert_eq!(imported[0].header.number, 3);
}

#[tokio::test]
async fn test_clearing_signer_ends_production() {
    let node = node();
    node.producer.start().await.unwrap();
    node.queue.enqueue();
    node.queue.complete_one();

    let sink = Arc::clone(&node.sink);
    wait_until(move || !sink.imported.lock().is_empty()).await;

    node.signer.set_signer(None);

    assert_eq!(
        timeout(Duration::from_secs(5), node.producer.join())
            .await
            .expect("loop should end on its own"),
        Err(BlockProductionError::SignerNotConfigured)
    );
    assert_eq!(node.metrics.get_failed_block_seals(), 1);
    assert!(!node.producer.is_running());

    node.producer.stop().await.unwrap();
}

#[tokio::test]
async fn test_signer_rotation_changes_block_author() {
    let node = node();
    node.producer.start().await.unwrap();
    node.queue.enqueue();
    node.queue.complete_one();

    let sink = Arc::clone(&node.sink);
    wait_until(move || !sink.imported.lock().is_empty()).await;

    let rotated = Signer::from_secret(1, &[0x47u8; 32]).unwrap().address();
    node.signer
        .set_signer(Some(qc_17_block_production::ProtectedKey::new(&[0x47u8; 32]).unwrap()));

    let sink = Arc::clone(&node.sink);
    wait_until(move || sink.imported.lock().iter().any(|b| b.author == rotated)).await;
    node.producer.stop().await.unwrap();

    for block in node.sink.imported.lock().iter() {
        assert_eq!(seal_signer(block), block.author);
    }
}
