//! In-memory collaborator doubles and block fixtures for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use avail_indexer_config::IndexerConfig;

use crate::client::{AccountBalance, ChainClient, ClientError, FeeDetails};
use crate::entities::{
    AccountRecord, AppLookupRecord, BlockRecord, CommitmentRecord, DataSubmissionRecord,
    EventRecord, ExtrinsicRecord, HeaderExtensionRecord, LogRecord, SessionRecord,
    SpecVersionRecord, TransferRecord,
};
use crate::state::IndexerState;
use crate::store::{Store, StoreError};

pub fn test_state(client: MockClient, store: MemoryStore) -> IndexerState<MockClient, MemoryStore> {
    IndexerState::new(client, store, IndexerConfig::default())
}

// ================================================================================================
// Chain client double
// ================================================================================================

#[derive(Default)]
pub struct MockClient {
    fee_details: Mutex<HashMap<String, FeeDetails>>,
    balances: Mutex<HashMap<String, AccountBalance>>,
    session_id: Mutex<u64>,
    validators: Mutex<Vec<String>>,
    fee_queries: AtomicUsize,
    balance_queries: AtomicUsize,
    validator_queries: AtomicUsize,
    fail_balances: AtomicBool,
    fail_session: AtomicBool,
}

impl MockClient {
    pub fn set_fee_details(
        &self,
        extrinsic_hex: &str,
        base_fee: Option<u128>,
        len_fee: Option<u128>,
        adjusted_weight_fee: Option<u128>,
    ) {
        self.fee_details.lock().unwrap().insert(
            extrinsic_hex.to_string(),
            FeeDetails {
                base_fee,
                len_fee,
                adjusted_weight_fee,
            },
        );
    }

    pub fn set_balance(&self, address: &str, balance: AccountBalance) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), balance);
    }

    pub fn set_session(&self, id: u64, validators: Vec<String>) {
        *self.session_id.lock().unwrap() = id;
        *self.validators.lock().unwrap() = validators;
    }

    pub fn fail_balance_queries(&self, fail: bool) {
        self.fail_balances.store(fail, Ordering::SeqCst);
    }

    pub fn fail_session_queries(&self, fail: bool) {
        self.fail_session.store(fail, Ordering::SeqCst);
    }

    pub fn fee_query_count(&self) -> usize {
        self.fee_queries.load(Ordering::SeqCst)
    }

    pub fn balance_query_count(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    pub fn validator_query_count(&self) -> usize {
        self.validator_queries.load(Ordering::SeqCst)
    }
}

impl ChainClient for MockClient {
    async fn query_fee_details(
        &self,
        extrinsic_hex: &str,
        _block_hash: &str,
    ) -> Result<Option<FeeDetails>, ClientError> {
        self.fee_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.fee_details.lock().unwrap().get(extrinsic_hex).cloned())
    }

    async fn query_balances(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Option<AccountBalance>>, ClientError> {
        if self.fail_balances.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("balance query refused".to_string()));
        }
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        let balances = self.balances.lock().unwrap();
        Ok(addresses
            .iter()
            .map(|address| balances.get(address).cloned())
            .collect())
    }

    async fn current_session_index(&self) -> Result<u64, ClientError> {
        if self.fail_session.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("session query refused".to_string()));
        }
        Ok(*self.session_id.lock().unwrap())
    }

    async fn session_validators(&self) -> Result<Vec<String>, ClientError> {
        if self.fail_session.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("session query refused".to_string()));
        }
        self.validator_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.validators.lock().unwrap().clone())
    }
}

// ================================================================================================
// Store double
// ================================================================================================

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
    spec_version_gets: AtomicUsize,
}

#[derive(Default)]
struct StoreInner {
    blocks: BTreeMap<u64, BlockRecord>,
    events: Vec<EventRecord>,
    extrinsics: Vec<ExtrinsicRecord>,
    data_submissions: Vec<DataSubmissionRecord>,
    transfers: Vec<TransferRecord>,
    logs: Vec<LogRecord>,
    accounts: BTreeMap<String, AccountRecord>,
    sessions: BTreeMap<u64, SessionRecord>,
    spec_versions: BTreeMap<u32, SpecVersionRecord>,
    extensions: Vec<(HeaderExtensionRecord, CommitmentRecord, AppLookupRecord)>,
    pending_accounts: Vec<String>,
}

impl MemoryStore {
    pub fn block(&self, height: u64) -> Option<BlockRecord> {
        self.inner.lock().unwrap().blocks.get(&height).cloned()
    }

    pub fn block_count(&self) -> usize {
        self.inner.lock().unwrap().blocks.len()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn extrinsics(&self) -> Vec<ExtrinsicRecord> {
        self.inner.lock().unwrap().extrinsics.clone()
    }

    pub fn extrinsic_count(&self) -> usize {
        self.inner.lock().unwrap().extrinsics.len()
    }

    pub fn data_submissions(&self) -> Vec<DataSubmissionRecord> {
        self.inner.lock().unwrap().data_submissions.clone()
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.inner.lock().unwrap().transfers.clone()
    }

    pub fn log_count(&self) -> usize {
        self.inner.lock().unwrap().logs.len()
    }

    pub fn account(&self, address: &str) -> Option<AccountRecord> {
        self.inner.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.inner.lock().unwrap().accounts.len()
    }

    pub fn seed_account(&self, account: AccountRecord) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(account.id.clone(), account);
    }

    pub fn session(&self, id: u64) -> Option<SessionRecord> {
        self.inner.lock().unwrap().sessions.get(&id).cloned()
    }

    pub fn spec_versions(&self) -> Vec<SpecVersionRecord> {
        self.inner.lock().unwrap().spec_versions.values().cloned().collect()
    }

    pub fn spec_version_get_count(&self) -> usize {
        self.spec_version_gets.load(Ordering::SeqCst)
    }

    pub fn header_extension(
        &self,
        index: usize,
    ) -> Option<(HeaderExtensionRecord, CommitmentRecord, AppLookupRecord)> {
        self.inner.lock().unwrap().extensions.get(index).cloned()
    }

    pub fn pending_accounts(&self) -> Vec<String> {
        self.inner.lock().unwrap().pending_accounts.clone()
    }

    pub fn seed_pending_accounts(&self, addresses: BTreeSet<String>) {
        self.inner.lock().unwrap().pending_accounts = addresses.into_iter().collect();
    }
}

impl Store for MemoryStore {
    async fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().blocks.get(&height).cloned())
    }

    async fn save_block(&self, block: &BlockRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .blocks
            .insert(block.height, block.clone());
        Ok(())
    }

    async fn bulk_create_events(&self, rows: &[EventRecord]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().events.extend_from_slice(rows);
        Ok(())
    }

    async fn bulk_create_extrinsics(&self, rows: &[ExtrinsicRecord]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().extrinsics.extend_from_slice(rows);
        Ok(())
    }

    async fn bulk_create_data_submissions(
        &self,
        rows: &[DataSubmissionRecord],
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .data_submissions
            .extend_from_slice(rows);
        Ok(())
    }

    async fn bulk_create_transfers(&self, rows: &[TransferRecord]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().transfers.extend_from_slice(rows);
        Ok(())
    }

    async fn bulk_create_logs(&self, rows: &[LogRecord]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().logs.extend_from_slice(rows);
        Ok(())
    }

    async fn bulk_create_accounts(&self, rows: &[AccountRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for row in rows {
            inner.accounts.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    async fn bulk_update_accounts(&self, rows: &[AccountRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for row in rows {
            inner.accounts.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    async fn get_account(&self, address: &str) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().accounts.get(address).cloned())
    }

    async fn get_session(&self, id: u64) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().sessions.get(&id).cloned())
    }

    async fn save_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_spec_version(&self, id: u32) -> Result<Option<SpecVersionRecord>, StoreError> {
        self.spec_version_gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.lock().unwrap().spec_versions.get(&id).cloned())
    }

    async fn save_spec_version(&self, row: &SpecVersionRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .spec_versions
            .insert(row.id, row.clone());
        Ok(())
    }

    async fn save_header_extension(
        &self,
        extension: &HeaderExtensionRecord,
        commitment: &CommitmentRecord,
        lookup: &AppLookupRecord,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().extensions.push((
            extension.clone(),
            commitment.clone(),
            lookup.clone(),
        ));
        Ok(())
    }

    async fn get_pending_accounts(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().unwrap().pending_accounts.clone())
    }

    async fn save_pending_accounts(&self, addresses: &[String]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().pending_accounts = addresses.to_vec();
        Ok(())
    }
}

// ================================================================================================
// Block fixtures
// ================================================================================================

pub mod fixtures {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::source::{EventPhase, InspectField, SourceBlock, SourceEvent, SourceExtrinsic};

    /// A decoded block at height 1000 with the given body.
    pub fn block_with(extrinsics: Vec<SourceExtrinsic>, events: Vec<SourceEvent>) -> SourceBlock {
        SourceBlock {
            height: 1000,
            hash: "0xb10c".to_string(),
            parent_hash: "0xb0ff".to_string(),
            state_root: "0x57a7".to_string(),
            extrinsics_root: "0xe147".to_string(),
            spec_version: 30,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            logs: vec![],
            extension: None,
            extrinsics,
            events,
        }
    }

    pub fn extrinsic(module: &str, call: &str) -> SourceExtrinsic {
        SourceExtrinsic {
            module: module.to_string(),
            call: call.to_string(),
            arg_names: vec![],
            args: vec![],
            hash: format!("0xhash-{module}-{call}"),
            is_signed: true,
            signer: "5Alice".to_string(),
            signature: "0x515".to_string(),
            nonce: 1,
            encoded_hex: format!("0xenc-{module}-{call}"),
            inspect: vec![],
        }
    }

    /// A `dataAvailability.submitData` extrinsic carrying `byte_size` payload
    /// bytes under the given app id (short compact encoding).
    pub fn submit_data_extrinsic(byte_size: usize, app_id: u64) -> SourceExtrinsic {
        let payload = format!("0x{}", "ab".repeat(byte_size));

        let shifted = app_id << 2;
        let mut app_id_bytes: Vec<u8> = shifted.to_le_bytes().to_vec();
        while app_id_bytes.len() > 1 && app_id_bytes.last() == Some(&0) {
            app_id_bytes.pop();
        }

        let mut source = extrinsic("dataAvailability", "submitData");
        source.arg_names = vec!["data".to_string()];
        source.args = vec![json!(payload)];
        source.inspect = vec![InspectField {
            name: "appId".to_string(),
            bytes: app_id_bytes,
        }];
        source
    }

    pub fn event(module: &str, name: &str, phase: EventPhase) -> SourceEvent {
        SourceEvent {
            module: module.to_string(),
            event: name.to_string(),
            arg_names: vec!["who".to_string()],
            args: vec![json!("5Who")],
            phase,
        }
    }

    pub fn fee_paid_event(phase: EventPhase) -> SourceEvent {
        SourceEvent {
            module: "transactionPayment".to_string(),
            event: "TransactionFeePaid".to_string(),
            arg_names: vec!["who".to_string(), "actualFee".to_string(), "tip".to_string()],
            args: vec![json!("5Alice"), json!("0"), json!("0")],
            phase,
        }
    }

    pub fn transfer_event(from: &str, to: &str, amount: u128, phase: EventPhase) -> SourceEvent {
        SourceEvent {
            module: "balances".to_string(),
            event: "Transfer".to_string(),
            arg_names: vec!["from".to_string(), "to".to_string(), "amount".to_string()],
            args: vec![json!(from), json!(to), json!(amount.to_string())],
            phase,
        }
    }
}
