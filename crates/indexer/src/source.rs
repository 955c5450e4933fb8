//! Decoded-block input model.
//!
//! The external block source hands over one fully decoded block per
//! invocation: header fields, extrinsics with method/args/signature/nonce,
//! events with phase, digest logs, and the optional header-extension sidecar.
//! Argument values arrive as `serde_json::Value` so the builders can apply
//! their transforms without re-decoding SCALE.

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SourceBlock {
    pub height: u64,
    pub hash: String,
    pub parent_hash: String,
    pub state_root: String,
    pub extrinsics_root: String,
    pub spec_version: u32,
    pub timestamp: DateTime<Utc>,
    pub logs: Vec<DigestLog>,
    /// Header-extension sidecar, a JSON document keyed by version (`v1`,
    /// `v2`, `v3`). Absent on chains without data-availability headers.
    pub extension: Option<String>,
    pub extrinsics: Vec<SourceExtrinsic>,
    pub events: Vec<SourceEvent>,
}

#[derive(Debug, Clone)]
pub struct SourceExtrinsic {
    pub module: String,
    pub call: String,
    pub arg_names: Vec<String>,
    pub args: Vec<Value>,
    pub hash: String,
    pub is_signed: bool,
    pub signer: String,
    pub signature: String,
    pub nonce: u64,
    /// Canonical hex encoding of the whole extrinsic, used for fee queries.
    pub encoded_hex: String,
    /// Named byte ranges from the raw extrinsic layout (signature fields,
    /// app id, call payload), as reported by the source's byte inspection.
    pub inspect: Vec<InspectField>,
}

#[derive(Debug, Clone)]
pub struct InspectField {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SourceEvent {
    pub module: String,
    pub event: String,
    pub arg_names: Vec<String>,
    pub args: Vec<Value>,
    pub phase: EventPhase,
}

impl SourceEvent {
    /// `module.event` key used by the classification tables.
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.event)
    }
}

/// Where in block execution an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Emitted while applying the extrinsic at this index.
    ApplyExtrinsic(u32),
    Initialization,
    Finalization,
}

impl EventPhase {
    pub fn extrinsic_index(&self) -> Option<u32> {
        match self {
            EventPhase::ApplyExtrinsic(idx) => Some(*idx),
            _ => None,
        }
    }
}

/// Consensus digest entry, decoded once at ingestion.
#[derive(Debug, Clone)]
pub enum DigestLog {
    PreRuntime { engine: String, data: String },
    Consensus { engine: String, data: String },
    Seal { engine: String, data: String },
    Other { data: String },
    AuthoritiesChange { data: String },
    ChangesTrieRoot { data: String },
}

impl DigestLog {
    pub fn kind(&self) -> &'static str {
        match self {
            DigestLog::PreRuntime { .. } => "PreRuntime",
            DigestLog::Consensus { .. } => "Consensus",
            DigestLog::Seal { .. } => "Seal",
            DigestLog::Other { .. } => "Other",
            DigestLog::AuthoritiesChange { .. } => "AuthoritiesChange",
            DigestLog::ChangesTrieRoot { .. } => "ChangesTrieRoot",
        }
    }

    pub fn engine(&self) -> Option<&str> {
        match self {
            DigestLog::PreRuntime { engine, .. }
            | DigestLog::Consensus { engine, .. }
            | DigestLog::Seal { engine, .. } => Some(engine),
            _ => None,
        }
    }

    pub fn data(&self) -> &str {
        match self {
            DigestLog::PreRuntime { data, .. }
            | DigestLog::Consensus { data, .. }
            | DigestLog::Seal { data, .. }
            | DigestLog::Other { data }
            | DigestLog::AuthoritiesChange { data }
            | DigestLog::ChangesTrieRoot { data } => data,
        }
    }
}
