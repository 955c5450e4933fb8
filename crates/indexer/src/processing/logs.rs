//! Digest-log extraction.

use crate::entities::{LogRecord, position_id};
use crate::source::DigestLog;

/// One record per digest entry, keyed `{height}-{index}`. Consensus, seal
/// and pre-runtime entries carry their consensus-engine id; the remaining
/// kinds are payload-only.
pub fn build_logs(height: u64, logs: &[DigestLog]) -> Vec<LogRecord> {
    logs.iter()
        .enumerate()
        .map(|(index, log)| LogRecord {
            id: position_id(height, index),
            block_height: height,
            kind: log.kind().to_string(),
            engine: log.engine().map(str::to_string),
            data: log.data().to_string(),
        })
        .collect()
}
