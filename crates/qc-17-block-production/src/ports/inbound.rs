//! Inbound ports (driving side - API)

use crate::error::Result;
use async_trait::async_trait;

/// Primary port: lifecycle of a block producer
///
/// Normally driven by a process lifecycle manager.
#[async_trait]
pub trait BlockProducer: Send + Sync {
    /// Register readiness handlers and spawn the production loop.
    ///
    /// Fails with `AlreadyRunning` unless the previous run was stopped.
    async fn start(&self) -> Result<()>;

    /// Unregister handlers, cancel the loop and wait for it to exit.
    ///
    /// Returns the loop's failure if it ended with one. Calling it again
    /// after the loop has exited is a no-op.
    async fn stop(&self) -> Result<()>;

    /// Started and not yet stopped
    fn is_running(&self) -> bool;
}
