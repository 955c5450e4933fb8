//! Event–extrinsic linking and classification.
//!
//! One forward pass over a block's events, in in-block order, does all of:
//! - map each event to its originating extrinsic via phase data,
//! - accumulate per-extrinsic aggregates (event count, outcome, fee) that
//!   the extrinsic builder consumes afterwards,
//! - classify events for materialization against the exclusion list,
//! - materialize transfers and collect every balance-touched address.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::entities::{EventRecord, TransferRecord, position_id};
use crate::source::{SourceBlock, SourceEvent};

use super::BuildError;
use super::args::{event_transform, render_args, stringify};
use super::codec::{json_number_string, round_price};
use super::fees::fees_from_event;

/// Balance-mutating events whose subject address (argument 0) needs a
/// balance refresh.
pub const BALANCE_EVENTS: &[&str] = &[
    "balances.BalanceSet",
    "balances.Deposit",
    "balances.DustLost",
    "balances.Endowed",
    "balances.Reserved",
    "balances.Slashed",
    "balances.Unreserved",
    "balances.Withdraw",
    "balances.Upgraded",
];

pub const FEE_EVENTS: &[&str] = &["transactionPayment.TransactionFeePaid"];

pub const TRANSFER_EVENTS: &[&str] = &["balances.Transfer"];

/// High-volume noise never materialized as Event records. Exclusion only
/// affects materialization: aggregation, transfers and balance tracking all
/// run first. Transfers are represented by their own record instead.
pub const EXCLUDED_EVENTS: &[&str] = &[
    "system.ExtrinsicSuccess",
    "system.ExtrinsicFailed",
    "system.Remarked",
    "treasury.Deposit",
    "balances.Deposit",
    "balances.Withdraw",
    "balances.Endowed",
    "balances.Transfer",
    "transactionPayment.TransactionFeePaid",
];

/// Per-extrinsic rollup the extrinsic builder consumes.
#[derive(Debug, Clone, Default)]
pub struct ExtrinsicAggregate {
    pub nb_events: u32,
    /// Explicit outcome when a success/failure system event was seen.
    pub success: Option<bool>,
    pub fees: Option<String>,
    pub fees_rounded: Option<f64>,
}

/// Everything the single pass extracts from a block's events.
#[derive(Debug, Default)]
pub struct BodyExtraction {
    pub events: Vec<EventRecord>,
    pub transfers: Vec<TransferRecord>,
    pub touched_accounts: BTreeSet<String>,
    pub aggregates: Vec<ExtrinsicAggregate>,
    /// Events with no owning extrinsic (initialization/finalization phases).
    pub block_scoped_events: u32,
}

pub fn link_events(block: &SourceBlock, currency: &str) -> Result<BodyExtraction, BuildError> {
    let mut out = BodyExtraction {
        aggregates: vec![ExtrinsicAggregate::default(); block.extrinsics.len()],
        ..Default::default()
    };

    for (index, event) in block.events.iter().enumerate() {
        let key = event.key();

        let extrinsic_id = match event.phase.extrinsic_index() {
            Some(extrinsic_index) => {
                let slot = out.aggregates.get_mut(extrinsic_index as usize).ok_or(
                    BuildError::EventExtrinsicOutOfRange {
                        event_index: index,
                        extrinsic_index,
                        extrinsic_count: block.extrinsics.len(),
                    },
                )?;

                slot.nb_events += 1;
                match key.as_str() {
                    "system.ExtrinsicSuccess" => slot.success = Some(true),
                    "system.ExtrinsicFailed" => slot.success = Some(false),
                    _ => {}
                }
                if FEE_EVENTS.contains(&key.as_str()) {
                    let (fees, fees_rounded) = fees_from_event(&event.args);
                    slot.fees = Some(fees);
                    slot.fees_rounded = Some(fees_rounded);
                }

                Some(position_id(block.height, extrinsic_index as usize))
            }
            None => {
                out.block_scoped_events += 1;
                None
            }
        };

        // Balance tracking and transfers run before the exclusion check so
        // excluded events still leave their trace.
        if BALANCE_EVENTS.contains(&key.as_str()) || FEE_EVENTS.contains(&key.as_str()) {
            let who = subject_address(block, index, event)?;
            out.touched_accounts.insert(who);
        }

        if TRANSFER_EVENTS.contains(&key.as_str()) {
            let transfer = build_transfer(
                block,
                index,
                event,
                extrinsic_id.clone().unwrap_or_default(),
                currency,
            )?;
            out.touched_accounts.insert(transfer.from.clone());
            out.touched_accounts.insert(transfer.to.clone());
            out.transfers.push(transfer);
        }

        if !EXCLUDED_EVENTS.contains(&key.as_str()) {
            out.events.push(build_event(block, index, event, extrinsic_id));
        }
    }

    Ok(out)
}

/// Map one decoded event to its stored record.
pub fn build_event(
    block: &SourceBlock,
    index: usize,
    event: &SourceEvent,
    extrinsic_id: Option<String>,
) -> EventRecord {
    let transform = event_transform(&event.module, &event.event);

    EventRecord {
        id: position_id(block.height, index),
        block_id: block.height.to_string(),
        block_height: block.height,
        module: event.module.clone(),
        event: event.event.clone(),
        event_index: index as u32,
        arg_names: event.arg_names.clone(),
        args: render_args(&event.args, transform),
        extrinsic_id,
        timestamp: block.timestamp,
    }
}

fn build_transfer(
    block: &SourceBlock,
    index: usize,
    event: &SourceEvent,
    extrinsic_id: String,
    currency: &str,
) -> Result<TransferRecord, BuildError> {
    let malformed = |reason: &str| BuildError::MalformedEvent {
        id: position_id(block.height, index),
        reason: reason.to_string(),
    };

    let from = transfer_party(event.args.first()).ok_or_else(|| malformed("missing sender"))?;
    let to = transfer_party(event.args.get(1)).ok_or_else(|| malformed("missing recipient"))?;
    let amount = event
        .args
        .get(2)
        .and_then(json_number_string)
        .ok_or_else(|| malformed("missing amount"))?;

    Ok(TransferRecord {
        id: position_id(block.height, index),
        block_id: block.height.to_string(),
        block_hash: block.hash.clone(),
        extrinsic_id,
        timestamp: block.timestamp,
        from,
        to,
        currency: currency.to_string(),
        amount_rounded: round_price(&amount),
        amount,
    })
}

fn transfer_party(arg: Option<&Value>) -> Option<String> {
    match arg? {
        Value::String(s) => Some(s.clone()),
        other => other.get("id").and_then(Value::as_str).map(str::to_string),
    }
}

fn subject_address(
    block: &SourceBlock,
    index: usize,
    event: &SourceEvent,
) -> Result<String, BuildError> {
    event
        .args
        .first()
        .map(stringify)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BuildError::MalformedEvent {
            id: position_id(block.height, index),
            reason: "balance event without subject address".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EventPhase;
    use crate::test_support::fixtures::{block_with, event, extrinsic};
    use serde_json::json;

    fn transfer_event(phase: EventPhase) -> SourceEvent {
        SourceEvent {
            module: "balances".to_string(),
            event: "Transfer".to_string(),
            arg_names: vec!["from".into(), "to".into(), "amount".into()],
            args: vec![
                json!("5Alice"),
                json!("5Bob"),
                json!("2000000000000000000"),
            ],
            phase,
        }
    }

    #[test]
    fn test_event_counts_sum_to_block_total() {
        let block = block_with(
            vec![extrinsic("timestamp", "set"), extrinsic("balances", "transfer")],
            vec![
                event("system", "ExtrinsicSuccess", EventPhase::ApplyExtrinsic(0)),
                event("balances", "Endowed", EventPhase::ApplyExtrinsic(1)),
                event("system", "ExtrinsicSuccess", EventPhase::ApplyExtrinsic(1)),
                event("session", "NewSession", EventPhase::Initialization),
                event("system", "Finalized", EventPhase::Finalization),
            ],
        );

        let body = link_events(&block, "AVL").unwrap();
        let owned: u32 = body.aggregates.iter().map(|a| a.nb_events).sum();
        assert_eq!(
            owned + body.block_scoped_events,
            block.events.len() as u32
        );
        assert_eq!(body.aggregates[0].nb_events, 1);
        assert_eq!(body.aggregates[1].nb_events, 2);
        assert_eq!(body.block_scoped_events, 2);
    }

    #[test]
    fn test_success_and_failure_mark_aggregates() {
        let block = block_with(
            vec![extrinsic("balances", "transfer"), extrinsic("balances", "transfer")],
            vec![
                event("system", "ExtrinsicSuccess", EventPhase::ApplyExtrinsic(0)),
                event("system", "ExtrinsicFailed", EventPhase::ApplyExtrinsic(1)),
            ],
        );

        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.aggregates[0].success, Some(true));
        assert_eq!(body.aggregates[1].success, Some(false));
    }

    #[test]
    fn test_excluded_events_are_not_materialized() {
        let block = block_with(
            vec![extrinsic("balances", "transfer")],
            vec![
                event("system", "ExtrinsicSuccess", EventPhase::ApplyExtrinsic(0)),
                event("balances", "Locked", EventPhase::ApplyExtrinsic(0)),
            ],
        );

        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.events.len(), 1);
        assert_eq!(body.events[0].event, "Locked");
        // but the excluded event still counted toward the aggregate
        assert_eq!(body.aggregates[0].nb_events, 2);
    }

    #[test]
    fn test_fee_event_fills_aggregate_and_touches_payer() {
        let mut fee_event = event(
            "transactionPayment",
            "TransactionFeePaid",
            EventPhase::ApplyExtrinsic(0),
        );
        fee_event.args = vec![json!("5Alice"), json!("1000000000000000000"), json!("0")];

        let block = block_with(vec![extrinsic("balances", "transfer")], vec![fee_event]);
        let body = link_events(&block, "AVL").unwrap();

        assert_eq!(body.aggregates[0].fees.as_deref(), Some("1000000000000000000"));
        assert_eq!(body.aggregates[0].fees_rounded, Some(1.0));
        assert!(body.touched_accounts.contains("5Alice"));
        // fee events themselves are excluded noise
        assert!(body.events.is_empty());
    }

    #[test]
    fn test_transfer_builds_record_and_touches_both_parties() {
        let block = block_with(
            vec![extrinsic("balances", "transfer")],
            vec![transfer_event(EventPhase::ApplyExtrinsic(0))],
        );

        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.transfers.len(), 1);

        let transfer = &body.transfers[0];
        assert_eq!(transfer.id, format!("{}-0", block.height));
        assert_eq!(transfer.from, "5Alice");
        assert_eq!(transfer.to, "5Bob");
        assert_eq!(transfer.currency, "AVL");
        assert_eq!(transfer.amount, "2000000000000000000");
        assert_eq!(transfer.amount_rounded, Some(2.0));
        assert_eq!(transfer.extrinsic_id, format!("{}-0", block.height));

        assert!(body.touched_accounts.contains("5Alice"));
        assert!(body.touched_accounts.contains("5Bob"));
        // transfers are excluded from the generic event table
        assert!(body.events.is_empty());
    }

    #[test]
    fn test_block_scoped_transfer_has_empty_extrinsic_id() {
        let block = block_with(vec![], vec![transfer_event(EventPhase::Finalization)]);
        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.transfers[0].extrinsic_id, "");
    }

    #[test]
    fn test_block_scoped_event_keeps_no_back_reference() {
        let block = block_with(
            vec![],
            vec![event("session", "NewSession", EventPhase::Initialization)],
        );
        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.events.len(), 1);
        assert_eq!(body.events[0].extrinsic_id, None);
    }

    #[test]
    fn test_owned_event_references_owner() {
        let block = block_with(
            vec![extrinsic("dataAvailability", "submitData")],
            vec![event("dataAvailability", "DataSubmitted", EventPhase::ApplyExtrinsic(0))],
        );
        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(
            body.events[0].extrinsic_id.as_deref(),
            Some(format!("{}-0", block.height).as_str())
        );
    }

    #[test]
    fn test_out_of_range_phase_index_fails_hard() {
        let block = block_with(
            vec![],
            vec![event("system", "ExtrinsicSuccess", EventPhase::ApplyExtrinsic(3))],
        );
        assert!(matches!(
            link_events(&block, "AVL"),
            Err(BuildError::EventExtrinsicOutOfRange { .. })
        ));
    }

    #[test]
    fn test_data_submitted_event_truncates_payload_arg() {
        let mut submitted = event(
            "dataAvailability",
            "DataSubmitted",
            EventPhase::ApplyExtrinsic(0),
        );
        submitted.args = vec![json!("5Alice"), json!(format!("0x{}", "ab".repeat(64)))];

        let block = block_with(vec![extrinsic("dataAvailability", "submitData")], vec![submitted]);
        let body = link_events(&block, "AVL").unwrap();
        assert_eq!(body.events[0].args[1].len(), 64);
    }
}
