//! Persistence collaborator contract.
//!
//! A narrow key-value surface: point get/save for identity-keyed records and
//! singleton state, plus bulk create/update per entity collection. The store
//! is assumed at-least-once durable; no transactions are assumed, which is
//! why the orchestrator writes the `BlockRecord` last.

use thiserror::Error;

use crate::entities::{
    AccountRecord, AppLookupRecord, BlockRecord, CommitmentRecord, DataSubmissionRecord,
    EventRecord, ExtrinsicRecord, HeaderExtensionRecord, LogRecord, SessionRecord,
    SpecVersionRecord, TransferRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait Store: Send + Sync {
    fn get_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<BlockRecord>, StoreError>> + Send;

    fn save_block(
        &self,
        block: &BlockRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_events(
        &self,
        rows: &[EventRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_extrinsics(
        &self,
        rows: &[ExtrinsicRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_data_submissions(
        &self,
        rows: &[DataSubmissionRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_transfers(
        &self,
        rows: &[TransferRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_logs(
        &self,
        rows: &[LogRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_create_accounts(
        &self,
        rows: &[AccountRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn bulk_update_accounts(
        &self,
        rows: &[AccountRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_account(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<AccountRecord>, StoreError>> + Send;

    fn get_session(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    fn save_session(
        &self,
        session: &SessionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_spec_version(
        &self,
        id: u32,
    ) -> impl Future<Output = Result<Option<SpecVersionRecord>, StoreError>> + Send;

    fn save_spec_version(
        &self,
        row: &SpecVersionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist the header-extension triple for one block.
    fn save_header_extension(
        &self,
        extension: &HeaderExtensionRecord,
        commitment: &CommitmentRecord,
        lookup: &AppLookupRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the singleton pending-account set (empty when never written).
    fn get_pending_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Overwrite the singleton pending-account set.
    fn save_pending_accounts(
        &self,
        addresses: &[String],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
