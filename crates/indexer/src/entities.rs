//! Persisted record set derived from one decoded block.
//!
//! Every record is immutable once written except `AccountRecord`, which is
//! upserted by the reconciliation batcher, and the in-progress `BlockRecord`,
//! which only gains its session id and author during the creation pass.
//! Extrinsic and event ids are derived deterministically from
//! `(height, position)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite id shared by extrinsics, events and logs: `{height}-{index}`.
pub fn position_id(height: u64, index: usize) -> String {
    format!("{height}-{index}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub id: String,
    pub height: u64,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub parent_hash: String,
    pub state_root: String,
    pub extrinsics_root: String,
    pub spec_version: u32,
    pub nb_extrinsics: u32,
    pub nb_events: u32,
    pub session_id: Option<u64>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtrinsicRecord {
    pub id: String,
    pub block_id: String,
    pub block_height: u64,
    pub module: String,
    pub call: String,
    pub success: bool,
    pub is_signed: bool,
    pub extrinsic_index: u32,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub signer: String,
    pub signature: String,
    pub nonce: u64,
    pub arg_names: Vec<String>,
    pub args: Vec<String>,
    pub nb_events: u32,
    /// Raw fee total in minimal units. `"0"` for fee-exempt modules without a
    /// fee event, empty when the fee query returned no inclusion fee.
    pub fees: String,
    pub fees_rounded: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub block_id: String,
    pub block_height: u64,
    pub module: String,
    pub event: String,
    pub event_index: u32,
    pub arg_names: Vec<String>,
    pub args: Vec<String>,
    /// Owning extrinsic, absent for block-scoped events.
    pub extrinsic_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub block_height: u64,
    pub kind: String,
    pub engine: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSubmissionRecord {
    pub id: String,
    pub extrinsic_id: String,
    pub timestamp: DateTime<Utc>,
    pub byte_size: u64,
    pub app_id: u32,
    pub signer: String,
    pub fees: Option<f64>,
    pub fees_per_mb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    pub block_id: String,
    pub block_hash: String,
    /// Empty when the transfer happened outside any extrinsic.
    pub extrinsic_id: String,
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub currency: String,
    pub amount: String,
    pub amount_rounded: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Address, the primary key.
    pub id: String,
    pub amount: String,
    pub amount_frozen: String,
    pub amount_total: String,
    pub amount_rounded: Option<f64>,
    pub amount_frozen_rounded: Option<f64>,
    pub amount_total_rounded: Option<f64>,
    pub validator: bool,
    pub validator_session_participated: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    /// Fresh record with zeroed balances, first seen at `now`.
    pub fn new(address: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: address.to_string(),
            amount: "0".to_string(),
            amount_frozen: "0".to_string(),
            amount_total: "0".to_string(),
            amount_rounded: None,
            amount_frozen_rounded: None,
            amount_total_rounded: None,
            validator: false,
            validator_session_participated: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: u64,
    pub validators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecVersionRecord {
    pub id: u32,
    /// Height at which this runtime version was first observed.
    pub block_height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeaderExtensionRecord {
    pub id: String,
    pub block_height: u64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentRecord {
    pub id: String,
    pub block_height: u64,
    pub header_extension_id: String,
    pub rows: u32,
    pub cols: u32,
    pub data_root: Option<String>,
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppLookupRecord {
    pub id: String,
    pub block_height: u64,
    pub header_extension_id: String,
    pub size: u32,
    /// Serialized application index map, kept opaque.
    pub index: String,
}
