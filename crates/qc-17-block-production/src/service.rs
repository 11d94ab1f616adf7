//! Block Producer Loop
//!
//! Fixed control loop around a pluggable [`ProductionStep`]:
//!
//! ```text
//! Start ─► register readiness listeners ─► spawn loop
//!                                            │
//!          ┌─────────────────────────────────┘
//!          ▼
//!   cancelled? ── yes ─► exit quietly
//!          │ no
//!   gate open && queue empty? ── no ─► wait poll interval (or cancel)
//!          │ yes
//!   step ── Ok ─► next iteration immediately
//!          └─ Err ─► log, count failed seal, exit with the error
//! ```
//!
//! The loop never restarts itself. Whoever drives the producer observes the
//! outcome through [`LoopBlockProducer::join`] or [`BlockProducer::stop`]
//! and decides what to do next.

use crate::config::BlockProductionConfig;
use crate::domain::ReadinessGate;
use crate::error::{BlockProductionError, Result};
use crate::metrics::Metrics;
use crate::ports::{BlockProcessingQueue, BlockProducer, BlockTree, ProductionStep};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Registration state of one `start()`..`stop()` run
struct ActiveRun {
    /// Cancels the loop (and, as parent, the listeners)
    cancel: CancellationToken,
    /// Cancels only the readiness listeners
    listener_cancel: CancellationToken,
    listeners: Vec<JoinHandle<()>>,
}

/// Everything the spawned loop owns
struct ProductionLoop {
    name: Arc<str>,
    poll_interval: Duration,
    queue: Arc<dyn BlockProcessingQueue>,
    step: Arc<dyn ProductionStep>,
    gate: Arc<ReadinessGate>,
    metrics: Arc<Metrics>,
}

impl ProductionLoop {
    /// `Ok(())` when stopped through `cancel`; `Err(Cancelled)` only when
    /// the step itself reported cancellation.
    async fn run(self, cancel: CancellationToken) -> Result<()> {
        while !cancel.is_cancelled() {
            if self.gate.can_produce() && self.queue.is_empty() {
                let produced = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    result = self.step.produce(&cancel) => result,
                };

                match produced {
                    Ok(()) => tokio::task::yield_now().await,
                    Err(e) if e.is_cancellation() => return Err(e),
                    Err(e) => {
                        error!("[{}] Failed to produce block. {}", self.name, e);
                        self.metrics.record_failed_seal();
                        return Err(e);
                    }
                }
            } else {
                debug!(
                    "[{}] Delaying producing block, chain not processed yet. Processing queue count {}",
                    self.name,
                    self.queue.count()
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        Ok(())
    }
}

/// Readiness-gated block producer running one background loop at a time.
pub struct LoopBlockProducer {
    name: Arc<str>,
    poll_interval: Duration,
    queue: Arc<dyn BlockProcessingQueue>,
    block_tree: Arc<dyn BlockTree>,
    step: Arc<dyn ProductionStep>,
    gate: Arc<ReadinessGate>,
    metrics: Arc<Metrics>,

    /// Set on start, cleared on stop or when the loop exits on its own
    is_running: Arc<AtomicBool>,
    active: parking_lot::Mutex<Option<ActiveRun>>,
    producer_task: tokio::sync::Mutex<Option<JoinHandle<Result<()>>>>,
}

impl LoopBlockProducer {
    /// Create a stopped producer. The readiness gate starts closed.
    pub fn new(
        config: &BlockProductionConfig,
        queue: Arc<dyn BlockProcessingQueue>,
        block_tree: Arc<dyn BlockTree>,
        step: Arc<dyn ProductionStep>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "[{}] Initializing block producer (poll interval {:?})",
            config.name,
            config.poll_interval()
        );

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            poll_interval: config.poll_interval(),
            queue,
            block_tree,
            step,
            gate: Arc::new(ReadinessGate::new(Arc::clone(&metrics))),
            metrics,
            is_running: Arc::new(AtomicBool::new(false)),
            active: parking_lot::Mutex::new(None),
            producer_task: tokio::sync::Mutex::new(None),
        })
    }

    /// Name used as the log prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Wait for the loop to exit without cancelling it and surface its outcome.
    ///
    /// Cancellation counts as a clean exit. Returns `Ok(())` when no loop has
    /// been spawned or its outcome was already collected.
    pub async fn join(&self) -> Result<()> {
        let mut slot = self.producer_task.lock().await;
        let Some(handle) = slot.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        *slot = None;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_cancellation() => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(join_error) => {
                error!("[{}] Producer loop task aborted: {}", self.name, join_error);
                Err(BlockProductionError::Internal(join_error.to_string()))
            }
        }
    }

    fn spawn_loop(&self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        let production_loop = ProductionLoop {
            name: Arc::clone(&self.name),
            poll_interval: self.poll_interval,
            queue: Arc::clone(&self.queue),
            step: Arc::clone(&self.step),
            gate: Arc::clone(&self.gate),
            metrics: Arc::clone(&self.metrics),
        };
        let name = Arc::clone(&self.name);
        let is_running = Arc::clone(&self.is_running);

        tokio::spawn(async move {
            let outcome = production_loop.run(cancel).await;
            is_running.store(false, Ordering::SeqCst);
            match &outcome {
                Ok(()) => debug!("[{}] Producer loop stopped", name),
                Err(e) if e.is_cancellation() => {
                    debug!("[{}] Producer loop cancelled by production step", name)
                }
                Err(e) => error!("[{}] Producer loop failed: {}", name, e),
            }
            outcome
        })
    }

    fn spawn_queue_listener(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let name = Arc::clone(&self.name);
        let gate = Arc::clone(&self.gate);
        let mut queue_empty = self.queue.subscribe_queue_empty();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = queue_empty.recv() => match received {
                        Ok(()) => gate.on_queue_became_empty(),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("[{}] Missed {} queue-empty notifications", name, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    fn spawn_best_suggested_listener(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let name = Arc::clone(&self.name);
        let gate = Arc::clone(&self.gate);
        let block_tree = Arc::clone(&self.block_tree);
        let mut best_suggested: broadcast::Receiver<_> = block_tree.subscribe_new_best_suggested();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = best_suggested.recv() => match received {
                        Ok(block) => {
                            gate.on_new_best_suggested_block(block.hash, block_tree.head_hash());
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("[{}] Missed {} best-suggested notifications", name, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}

#[async_trait]
impl BlockProducer for LoopBlockProducer {
    async fn start(&self) -> Result<()> {
        let mut task = self.producer_task.lock().await;
        let mut active = self.active.lock();
        if active.is_some() || task.is_some() {
            return Err(BlockProductionError::AlreadyRunning);
        }

        // Anything announced while stopped was missed; wait for a fresh signal.
        self.gate.reset();

        let cancel = CancellationToken::new();
        let listener_cancel = cancel.child_token();
        let listeners = vec![
            self.spawn_queue_listener(listener_cancel.clone()),
            self.spawn_best_suggested_listener(listener_cancel.clone()),
        ];
        *active = Some(ActiveRun {
            cancel: cancel.clone(),
            listener_cancel,
            listeners,
        });

        self.is_running.store(true, Ordering::SeqCst);
        *task = Some(self.spawn_loop(cancel));

        info!("[{}] Block producer started", self.name);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let run = self.active.lock().take();
        if let Some(run) = run {
            run.listener_cancel.cancel();
            for listener in run.listeners {
                if let Err(e) = listener.await {
                    warn!("[{}] Readiness listener ended abnormally: {}", self.name, e);
                }
            }

            self.is_running.store(false, Ordering::SeqCst);
            run.cancel.cancel();
            info!("[{}] Block producer stopping", self.name);
        }

        self.join().await
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Drop for LoopBlockProducer {
    fn drop(&mut self) {
        if let Some(run) = self.active.get_mut().take() {
            run.cancel.cancel();
        }
    }
}
