//! Chain-node collaborator contract.
//!
//! The pipeline never talks to a node directly; everything it needs from
//! chain state comes through this trait. Implementations own transport,
//! retries and timeouts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode node response: {0}")]
    Decode(String),
}

/// Itemized inclusion fee for one extrinsic, as returned by the node's fee
/// query. Each component may be absent and counts as zero.
#[derive(Debug, Clone, Default)]
pub struct FeeDetails {
    pub base_fee: Option<u128>,
    pub len_fee: Option<u128>,
    pub adjusted_weight_fee: Option<u128>,
}

/// Raw balance fields for one account.
///
/// Older runtimes report frozen balance as two sub-fields (`misc_frozen`,
/// `fee_frozen`); newer runtimes as a single `frozen` field. Both shapes are
/// carried so the batcher can pick.
#[derive(Debug, Clone, Default)]
pub struct AccountBalance {
    pub free: u128,
    pub reserved: u128,
    pub frozen: Option<u128>,
    pub misc_frozen: Option<u128>,
    pub fee_frozen: Option<u128>,
}

pub trait ChainClient: Send + Sync {
    /// Itemized fee details for an encoded extrinsic at a block. `None` when
    /// the node reports no inclusion fee for it.
    fn query_fee_details(
        &self,
        extrinsic_hex: &str,
        block_hash: &str,
    ) -> impl Future<Output = Result<Option<FeeDetails>, ClientError>> + Send;

    /// Current balances for the given addresses, one entry per input address
    /// in input order. `None` marks an address the node has no record for.
    fn query_balances(
        &self,
        addresses: &[String],
    ) -> impl Future<Output = Result<Vec<Option<AccountBalance>>, ClientError>> + Send;

    fn current_session_index(&self) -> impl Future<Output = Result<u64, ClientError>> + Send;

    fn session_validators(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;
}
