//! Extrinsic and data-submission builders.

use crate::client::ChainClient;
use crate::entities::{DataSubmissionRecord, ExtrinsicRecord, position_id};
use crate::source::{SourceBlock, SourceExtrinsic};

use super::args::{extrinsic_transform, render_args};
use super::codec::{decode_app_id, round_price, strip_hex_prefix};
use super::events::ExtrinsicAggregate;
use super::fees::{fee_per_mb, query_total_fees, should_query_fees};

const DATA_SUBMISSION_MODULE: &str = "dataAvailability";
const DATA_SUBMISSION_CALL: &str = "submitData";

/// Name of the app-id field in the raw extrinsic layout inspection.
const APP_ID_FIELD: &str = "appId";

/// Map one decoded extrinsic and its event aggregate to the stored record.
///
/// Fee resolution prefers the fee already extracted from the in-block
/// fee-paid event; fee-exempt modules resolve to `"0"` without any query;
/// everything else asks the node for itemized fee details.
pub async fn build_extrinsic<C: ChainClient>(
    client: &C,
    block: &SourceBlock,
    index: usize,
    source: &SourceExtrinsic,
    aggregate: &ExtrinsicAggregate,
) -> ExtrinsicRecord {
    let (fees, fees_rounded) = resolve_fees(client, block, source, aggregate).await;

    let transform = extrinsic_transform(&source.module, &source.call);

    ExtrinsicRecord {
        id: position_id(block.height, index),
        block_id: block.height.to_string(),
        block_height: block.height,
        module: source.module.clone(),
        call: source.call.clone(),
        success: aggregate.success.unwrap_or(true),
        is_signed: source.is_signed,
        extrinsic_index: index as u32,
        hash: source.hash.clone(),
        timestamp: block.timestamp,
        signer: source.signer.clone(),
        signature: source.signature.clone(),
        nonce: source.nonce,
        arg_names: source.arg_names.clone(),
        args: render_args(&source.args, transform),
        nb_events: aggregate.nb_events,
        fees,
        fees_rounded,
    }
}

async fn resolve_fees<C: ChainClient>(
    client: &C,
    block: &SourceBlock,
    source: &SourceExtrinsic,
    aggregate: &ExtrinsicAggregate,
) -> (String, Option<f64>) {
    if let Some(fees) = &aggregate.fees {
        return (fees.clone(), aggregate.fees_rounded);
    }

    if !should_query_fees(&source.module) {
        return ("0".to_string(), round_price("0"));
    }

    let fees = query_total_fees(client, &source.encoded_hex, &block.hash).await;
    let fees_rounded = if fees.is_empty() {
        None
    } else {
        round_price(&fees)
    };
    (fees, fees_rounded)
}

/// Data-submission record for a `dataAvailability.submitData` extrinsic with
/// a non-empty payload; `None` for every other extrinsic.
///
/// The byte size comes from the full payload argument (before the stored
/// form is truncated); the app id is decoded from the raw-layout inspection
/// and defaults to 0 when absent or undecodable.
pub fn build_data_submission(
    block: &SourceBlock,
    source: &SourceExtrinsic,
    extrinsic: &ExtrinsicRecord,
) -> Option<DataSubmissionRecord> {
    if source.module != DATA_SUBMISSION_MODULE || source.call != DATA_SUBMISSION_CALL {
        return None;
    }

    let payload = source.args.first().and_then(|arg| arg.as_str())?;
    let byte_size = strip_hex_prefix(payload).len() as u64 / 2;
    if byte_size == 0 {
        return None;
    }

    let app_id = source
        .inspect
        .iter()
        .find(|field| field.name == APP_ID_FIELD)
        .map(|field| match decode_app_id(&field.bytes) {
            Ok(value) => value as u32,
            Err(err) => {
                tracing::warn!(
                    extrinsic = %extrinsic.id,
                    error = %err,
                    "undecodable app id, defaulting to 0"
                );
                0
            }
        })
        .unwrap_or(0);

    let fees = extrinsic.fees_rounded;
    let fees_per_mb = fees.and_then(|fee| fee_per_mb(fee, byte_size));

    tracing::info!(extrinsic = %extrinsic.id, app_id, byte_size, "new data submission recorded");

    Some(DataSubmissionRecord {
        id: extrinsic.id.clone(),
        extrinsic_id: extrinsic.id.clone(),
        timestamp: block.timestamp,
        byte_size,
        app_id,
        signer: source.signer.clone(),
        fees,
        fees_per_mb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InspectField;
    use crate::test_support::MockClient;
    use crate::test_support::fixtures::{block_with, extrinsic, submit_data_extrinsic};
    use serde_json::json;

    fn aggregate(fees: Option<&str>, fees_rounded: Option<f64>) -> ExtrinsicAggregate {
        ExtrinsicAggregate {
            nb_events: 1,
            success: Some(true),
            fees: fees.map(str::to_string),
            fees_rounded,
        }
    }

    #[tokio::test]
    async fn test_event_fee_is_preferred_over_rpc() {
        let client = MockClient::default();
        let block = block_with(vec![extrinsic("balances", "transfer")], vec![]);

        let record = build_extrinsic(
            &client,
            &block,
            0,
            &block.extrinsics[0],
            &aggregate(Some("5000"), Some(0.0)),
        )
        .await;

        assert_eq!(record.fees, "5000");
        assert_eq!(client.fee_query_count(), 0);
    }

    #[tokio::test]
    async fn test_fee_exempt_module_is_zero_without_query() {
        let client = MockClient::default();
        let block = block_with(vec![extrinsic("timestamp", "set")], vec![]);

        let record = build_extrinsic(
            &client,
            &block,
            0,
            &block.extrinsics[0],
            &ExtrinsicAggregate::default(),
        )
        .await;

        assert_eq!(record.fees, "0");
        assert_eq!(record.fees_rounded, Some(0.0));
        assert_eq!(client.fee_query_count(), 0);
    }

    #[tokio::test]
    async fn test_fee_rpc_path() {
        let client = MockClient::default();
        let block = block_with(vec![extrinsic("balances", "transfer")], vec![]);
        client.set_fee_details(
            &block.extrinsics[0].encoded_hex,
            Some(1_000_000_000_000_000_000),
            None,
            None,
        );

        let record = build_extrinsic(
            &client,
            &block,
            0,
            &block.extrinsics[0],
            &ExtrinsicAggregate::default(),
        )
        .await;

        assert_eq!(record.fees, "1000000000000000000");
        assert_eq!(record.fees_rounded, Some(1.0));
        assert_eq!(client.fee_query_count(), 1);
    }

    #[tokio::test]
    async fn test_no_inclusion_fee_yields_empty_string() {
        let client = MockClient::default();
        let block = block_with(vec![extrinsic("balances", "transfer")], vec![]);

        let record = build_extrinsic(
            &client,
            &block,
            0,
            &block.extrinsics[0],
            &ExtrinsicAggregate::default(),
        )
        .await;

        assert_eq!(record.fees, "");
        assert_eq!(record.fees_rounded, None);
    }

    #[tokio::test]
    async fn test_success_defaults_to_true_without_failure_event() {
        let client = MockClient::default();
        let block = block_with(vec![extrinsic("timestamp", "set")], vec![]);

        let record = build_extrinsic(
            &client,
            &block,
            0,
            &block.extrinsics[0],
            &ExtrinsicAggregate::default(),
        )
        .await;

        assert!(record.success);
    }

    #[test]
    fn test_data_submission_built_from_full_payload() {
        let block = block_with(vec![submit_data_extrinsic(2048, 5)], vec![]);
        let record = ExtrinsicRecord {
            fees_rounded: Some(1.0),
            ..sample_record(&block)
        };

        let submission = build_data_submission(&block, &block.extrinsics[0], &record).unwrap();
        assert_eq!(submission.byte_size, 2048);
        assert_eq!(submission.app_id, 5);
        assert_eq!(submission.fees, Some(1.0));
        assert_eq!(submission.fees_per_mb, Some(512.0));
        assert_eq!(submission.id, record.id);
    }

    #[test]
    fn test_data_submission_defaults_app_id_without_inspection() {
        let mut source = submit_data_extrinsic(16, 0);
        source.inspect.clear();
        let block = block_with(vec![source], vec![]);
        let record = sample_record(&block);

        let submission = build_data_submission(&block, &block.extrinsics[0], &record).unwrap();
        assert_eq!(submission.app_id, 0);
    }

    #[test]
    fn test_data_submission_defaults_app_id_on_bad_bytes() {
        let mut source = submit_data_extrinsic(16, 0);
        source.inspect = vec![InspectField {
            name: "appId".to_string(),
            bytes: vec![],
        }];
        let block = block_with(vec![source], vec![]);
        let record = sample_record(&block);

        let submission = build_data_submission(&block, &block.extrinsics[0], &record).unwrap();
        assert_eq!(submission.app_id, 0);
    }

    #[test]
    fn test_empty_payload_produces_no_submission() {
        let mut source = submit_data_extrinsic(0, 0);
        source.args = vec![json!("0x")];
        let block = block_with(vec![source], vec![]);
        let record = sample_record(&block);

        assert!(build_data_submission(&block, &block.extrinsics[0], &record).is_none());
    }

    #[test]
    fn test_other_calls_produce_no_submission() {
        let block = block_with(vec![extrinsic("balances", "transfer")], vec![]);
        let record = sample_record(&block);
        assert!(build_data_submission(&block, &block.extrinsics[0], &record).is_none());
    }

    fn sample_record(block: &SourceBlock) -> ExtrinsicRecord {
        ExtrinsicRecord {
            id: position_id(block.height, 0),
            block_id: block.height.to_string(),
            block_height: block.height,
            module: block.extrinsics[0].module.clone(),
            call: block.extrinsics[0].call.clone(),
            success: true,
            is_signed: true,
            extrinsic_index: 0,
            hash: "0xff".to_string(),
            timestamp: block.timestamp,
            signer: block.extrinsics[0].signer.clone(),
            signature: String::new(),
            nonce: 0,
            arg_names: vec![],
            args: vec![],
            nb_events: 0,
            fees: String::new(),
            fees_rounded: None,
        }
    }
}
