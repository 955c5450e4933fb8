//! Per-block orchestration.
//!
//! One invocation processes one block to completion; no two blocks run
//! concurrently against the same pending-account state. Within the block,
//! independent sub-tasks (header-phase fetches, bulk creates over disjoint
//! collections) are joined rather than sequenced. The BlockRecord is written
//! last: its existence is the idempotency signal, so a failed block leaves
//! nothing a retry would trip over.

use futures::future::join_all;
use thiserror::Error;

use crate::client::ChainClient;
use crate::entities::{BlockRecord, SpecVersionRecord};
use crate::source::SourceBlock;
use crate::state::IndexerState;
use crate::store::{Store, StoreError};

use super::BuildError;
use super::{accounts, events, extension, extrinsics, logs, session};

#[derive(Debug, Error)]
pub enum ProcessBlockError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Processed,
    /// A BlockRecord already exists at this height; nothing was written.
    AlreadyIndexed,
}

/// Terminal entry point for the scheduler: processes the block and logs any
/// failure instead of propagating it. The failed height is retried wholesale
/// by a later invocation.
pub async fn handle_block<C: ChainClient, S: Store>(
    state: &IndexerState<C, S>,
    block: &SourceBlock,
) {
    if block.height % 100 == 0 {
        tracing::info!(
            height = block.height,
            spec_version = block.spec_version,
            "handling block"
        );
    }

    if let Err(err) = process_block(state, block).await {
        tracing::error!(height = block.height, error = %err, "block processing failed");
    }
}

pub async fn process_block<C: ChainClient, S: Store>(
    state: &IndexerState<C, S>,
    block: &SourceBlock,
) -> Result<BlockOutcome, ProcessBlockError> {
    if state.store.get_block(block.height).await?.is_some() {
        return Ok(BlockOutcome::AlreadyIndexed);
    }

    let mut block_record = BlockRecord {
        id: block.height.to_string(),
        height: block.height,
        hash: block.hash.clone(),
        timestamp: block.timestamp,
        parent_hash: block.parent_hash.clone(),
        state_root: block.state_root.clone(),
        extrinsics_root: block.extrinsics_root.clone(),
        spec_version: block.spec_version,
        nb_extrinsics: block.extrinsics.len() as u32,
        nb_events: block.events.len() as u32,
        session_id: None,
        author: None,
    };

    // Header phase: four independent tasks over disjoint state.
    let log_records = logs::build_logs(block.height, &block.logs);
    let extension_triple = extension::build_extension(block.height, block.extension.as_deref())?;

    let (logs_saved, session_info, spec_saved, extension_saved) = tokio::join!(
        state.store.bulk_create_logs(&log_records),
        session::update_session(&state.client, &state.store, &block.logs, block.timestamp),
        update_spec_version(state, block.spec_version, block.height),
        async {
            match &extension_triple {
                Some(triple) => {
                    state
                        .store
                        .save_header_extension(&triple.extension, &triple.commitment, &triple.lookup)
                        .await
                }
                None => Ok(()),
            }
        },
    );
    logs_saved?;
    spec_saved?;
    extension_saved?;

    block_record.session_id = session_info.session_id;
    block_record.author = session_info.author;

    // Body phase: one linker pass, then builders consuming its aggregates.
    let body = events::link_events(block, &state.config.chain.currency)?;

    let extrinsic_records = join_all(block.extrinsics.iter().enumerate().map(
        |(index, source)| {
            extrinsics::build_extrinsic(&state.client, block, index, source, &body.aggregates[index])
        },
    ))
    .await;

    let data_submissions: Vec<_> = block
        .extrinsics
        .iter()
        .zip(&extrinsic_records)
        .filter_map(|(source, record)| extrinsics::build_data_submission(block, source, record))
        .collect();

    // Reconciliation phase.
    accounts::reconcile_accounts(
        &state.client,
        &state.store,
        &state.config.reconcile,
        block.height,
        &body.touched_accounts,
        block.timestamp,
    )
    .await?;

    // Persistence phase; the BlockRecord write comes last.
    tokio::try_join!(
        state.store.bulk_create_events(&body.events),
        state.store.bulk_create_extrinsics(&extrinsic_records),
        state.store.bulk_create_data_submissions(&data_submissions),
        state.store.bulk_create_transfers(&body.transfers),
    )?;

    state.store.save_block(&block_record).await?;

    Ok(BlockOutcome::Processed)
}

/// Record first observations of a runtime version, going through the store
/// only when the process-local cache misses.
async fn update_spec_version<C: ChainClient, S: Store>(
    state: &IndexerState<C, S>,
    version: u32,
    height: u64,
) -> Result<(), StoreError> {
    if state.cached_spec_version() == Some(version) {
        return Ok(());
    }

    if state.store.get_spec_version(version).await?.is_none() {
        state
            .store
            .save_spec_version(&SpecVersionRecord {
                id: version,
                block_height: height,
            })
            .await?;
        tracing::info!(version, height, "new runtime spec version recorded");
    }

    state.set_cached_spec_version(version);
    Ok(())
}
