//! Per-block extraction pipeline.
//!
//! Leaves first: codec/numeric utilities, the fee resolver, entity builders,
//! the event–extrinsic linker, the account reconciliation batcher, the
//! session tracker, and the block orchestrator driving them all.

pub mod accounts;
pub mod args;
pub mod block;
pub mod codec;
pub mod events;
pub mod extension;
pub mod extrinsics;
pub mod fees;
pub mod logs;
pub mod session;

use thiserror::Error;

/// Hard builder failures: the decoded block does not match the shape the
/// builders were written against. These surface to the orchestrator's
/// catch-all instead of silently producing wrong records.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "Event {event_index} references extrinsic {extrinsic_index} but block has {extrinsic_count} extrinsics"
    )]
    EventExtrinsicOutOfRange {
        event_index: usize,
        extrinsic_index: u32,
        extrinsic_count: usize,
    },

    #[error("Malformed event {id}: {reason}")]
    MalformedEvent { id: String, reason: String },

    #[error("Malformed header extension sidecar: {0}")]
    MalformedExtension(#[from] serde_json::Error),

    #[error("Header extension sidecar carries no recognized version key")]
    UnknownExtensionVersion,
}
