//! Transaction fee resolution.
//!
//! Two sources, in preference order: the in-block fee-paid event (no RPC
//! round-trip), and the node's itemized fee query for signed extrinsics of
//! fee-paying modules. Both fail soft: a fee can be missing, but fee
//! resolution never aborts a block.

use serde_json::Value;

use crate::client::ChainClient;

use super::codec::{json_number_string, round_price};

/// Modules whose extrinsics never carry a transaction fee; the fee query is
/// skipped for them entirely.
pub const FEE_EXEMPT_MODULES: &[&str] = &["timestamp", "authorship"];

pub fn should_query_fees(module: &str) -> bool {
    !FEE_EXEMPT_MODULES.contains(&module)
}

/// Total inclusion fee for an encoded extrinsic, as a decimal string.
///
/// Sums the optional base, length and adjusted-weight components. Empty when
/// the node reports no inclusion fee, and empty (logged) when the query
/// itself fails.
pub async fn query_total_fees<C: ChainClient>(
    client: &C,
    extrinsic_hex: &str,
    block_hash: &str,
) -> String {
    match client.query_fee_details(extrinsic_hex, block_hash).await {
        Ok(Some(details)) => {
            let total: u128 = details
                .base_fee
                .unwrap_or(0)
                .saturating_add(details.len_fee.unwrap_or(0))
                .saturating_add(details.adjusted_weight_fee.unwrap_or(0));
            total.to_string()
        }
        Ok(None) => String::new(),
        Err(err) => {
            tracing::error!(block_hash, error = %err, "extrinsic fee query failed");
            String::new()
        }
    }
}

/// Fee total from a fee-paid event's positional arguments: fee is argument 1,
/// tip is argument 2. Malformed payloads resolve to `("0", 0.0)`.
pub fn fees_from_event(args: &[Value]) -> (String, f64) {
    match parse_fee_args(args) {
        Some(total) => {
            let raw = total.to_string();
            let rounded = round_price(&raw).unwrap_or(0.0);
            (raw, rounded)
        }
        None => {
            tracing::error!(?args, "malformed fee-paid event payload");
            ("0".to_string(), 0.0)
        }
    }
}

fn parse_fee_args(args: &[Value]) -> Option<u128> {
    let fee: u128 = json_number_string(args.get(1)?)?.parse().ok()?;
    let tip: u128 = json_number_string(args.get(2)?)?.parse().ok()?;
    fee.checked_add(tip)
}

/// Fee density of a data submission: rounded fee spread over its payload,
/// scaled to one megabyte. Undefined for empty payloads.
pub fn fee_per_mb(rounded_fee: f64, byte_size: u64) -> Option<f64> {
    if byte_size == 0 {
        return None;
    }
    Some(rounded_fee / byte_size as f64 * 1_048_576.0)
}
