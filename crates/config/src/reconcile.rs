use crate::ConfigError;
use serde::Deserialize;

/// Thresholds driving the account-balance reconciliation batcher.
///
/// Touched addresses accumulate in a persisted pending set across blocks and
/// are flushed in bulk, so balance queries stay bounded under high event
/// throughput.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Pending-set size at which a flush fires immediately
    ///
    /// Env: IDX_RECONCILE_FLUSH_THRESHOLD
    /// Default: 100
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Block-height cadence at which a non-empty pending set flushes
    ///
    /// Env: IDX_RECONCILE_FLUSH_CADENCE_BLOCKS
    /// Default: 50
    #[serde(default = "default_flush_cadence")]
    pub flush_cadence_blocks: u64,

    /// Maximum addresses per balance query to the chain node
    ///
    /// Env: IDX_RECONCILE_BALANCE_BATCH_SIZE
    /// Default: 100
    #[serde(default = "default_balance_batch_size")]
    pub balance_batch_size: usize,
}

fn default_flush_threshold() -> usize {
    100
}

fn default_flush_cadence() -> u64 {
    50
}

fn default_balance_batch_size() -> usize {
    100
}

impl ReconcileConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_threshold == 0 {
            return Err(ConfigError::ValidateError(
                "Reconcile flush threshold cannot be 0".to_string(),
            ));
        }

        if self.flush_cadence_blocks == 0 {
            return Err(ConfigError::ValidateError(
                "Reconcile flush cadence cannot be 0".to_string(),
            ));
        }

        if self.balance_batch_size == 0 {
            return Err(ConfigError::ValidateError(
                "Balance batch size cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            flush_cadence_blocks: default_flush_cadence(),
            balance_batch_size: default_balance_batch_size(),
        }
    }
}
