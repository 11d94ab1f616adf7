//! Configuration types for block production

use crate::error::{BlockProductionError, Result};
use serde::Deserialize;
use shared_crypto::ProtectedKey;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Runtime configuration for the production loop and its signer
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockProductionConfig {
    /// Producer name, used as the log prefix
    pub name: String,

    /// Chain id embedded in transaction signatures (EIP-155)
    pub chain_id: u64,

    /// Delay between readiness polls while the chain is catching up
    pub readiness_poll_interval_ms: u64,

    /// Hex-encoded 32-byte signing key (None = start unable to sign)
    pub signer_key_path: Option<PathBuf>,
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            name: "loop".to_string(),
            chain_id: crate::DEFAULT_CHAIN_ID,
            readiness_poll_interval_ms: crate::CHAIN_NOT_YET_PROCESSED_DELAY_MS,
            signer_key_path: None,
        }
    }
}

impl BlockProductionConfig {
    /// Reject values the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BlockProductionError::InvalidConfig(
                "producer name must not be empty".to_string(),
            ));
        }
        if self.readiness_poll_interval_ms == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "readiness poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Readiness poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    /// Load the configured signing key, if any
    pub fn load_signer_key(&self) -> Result<Option<ProtectedKey>> {
        self.signer_key_path
            .as_deref()
            .map(load_protected_key)
            .transpose()
    }
}

/// Read a hex key file (optional `0x` prefix) straight into a [`ProtectedKey`].
///
/// Every intermediate buffer holding key material is zeroized on return.
pub fn load_protected_key(path: &Path) -> Result<ProtectedKey> {
    let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        BlockProductionError::InvalidConfig(format!(
            "cannot read signer key {}: {}",
            path.display(),
            e
        ))
    })?);

    let trimmed = contents.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(hex::decode(hex_key).map_err(|e| {
        BlockProductionError::InvalidConfig(format!(
            "signer key {} is not valid hex: {}",
            path.display(),
            e
        ))
    })?);

    Ok(ProtectedKey::from_slice(&bytes)?)
}
