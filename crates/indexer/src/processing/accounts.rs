//! Account-balance reconciliation batcher.
//!
//! Touched addresses accumulate in a persisted singleton set across blocks
//! and are reconciled in bulk when the set crosses a size threshold or the
//! block height hits the flush cadence. This bounds balance-query volume to
//! the node under high event throughput: one batched query per flush instead
//! of one per touched address per block.

use std::collections::BTreeSet;

use avail_indexer_config::ReconcileConfig;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::client::{AccountBalance, ChainClient, ClientError};
use crate::entities::AccountRecord;
use crate::store::{Store, StoreError};

use super::codec::round_price;

#[derive(Debug, Error)]
enum FlushError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Merge this block's touched addresses into the pending set and flush when
/// a trigger condition holds.
///
/// The merged set is persisted before the flush so a crash never loses
/// addresses; a failed flush keeps it persisted for retry on a later block
/// and does not abort the block.
pub async fn reconcile_accounts<C: ChainClient, S: Store>(
    client: &C,
    store: &S,
    config: &ReconcileConfig,
    height: u64,
    touched: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut pending: BTreeSet<String> = store.get_pending_accounts().await?.into_iter().collect();
    pending.extend(touched.iter().cloned());

    if pending.is_empty() {
        return Ok(());
    }

    let addresses: Vec<String> = pending.iter().cloned().collect();
    store.save_pending_accounts(&addresses).await?;

    if !should_flush(config, height, addresses.len()) {
        return Ok(());
    }

    match flush_balances(client, store, config, &addresses, now).await {
        Ok(()) => {
            store.save_pending_accounts(&[]).await?;
            tracing::debug!(height, flushed = addresses.len(), "account balances reconciled");
        }
        Err(err) => {
            tracing::error!(
                height,
                pending = addresses.len(),
                error = %err,
                "balance flush failed, keeping pending set for retry"
            );
        }
    }

    Ok(())
}

fn should_flush(config: &ReconcileConfig, height: u64, pending_len: usize) -> bool {
    pending_len >= config.flush_threshold
        || (pending_len > 0 && height % config.flush_cadence_blocks == 0)
}

async fn flush_balances<C: ChainClient, S: Store>(
    client: &C,
    store: &S,
    config: &ReconcileConfig,
    addresses: &[String],
    now: DateTime<Utc>,
) -> Result<(), FlushError> {
    for chunk in addresses.chunks(config.balance_batch_size) {
        let balances = client.query_balances(chunk).await?;

        let mut created = Vec::new();
        let mut updated = Vec::new();

        for (address, balance) in chunk.iter().zip(balances) {
            let Some(balance) = balance else {
                tracing::error!(%address, "balance not found for pending account");
                continue;
            };

            match store.get_account(address).await? {
                Some(mut account) => {
                    apply_balance(&mut account, &balance);
                    account.updated_at = now;
                    updated.push(account);
                }
                None => {
                    let mut account = AccountRecord::new(address, now);
                    apply_balance(&mut account, &balance);
                    created.push(account);
                }
            }
        }

        if !created.is_empty() {
            store.bulk_create_accounts(&created).await?;
        }
        if !updated.is_empty() {
            store.bulk_update_accounts(&updated).await?;
        }
    }

    Ok(())
}

/// Rewrite the three raw amounts and recompute every rounded twin from its
/// raw form; rounded values are never carried over independently.
fn apply_balance(account: &mut AccountRecord, balance: &AccountBalance) {
    let frozen = resolve_frozen(balance);
    let amount = balance.free.saturating_sub(frozen);
    let amount_total = balance.free.saturating_add(balance.reserved);

    account.amount = amount.to_string();
    account.amount_frozen = frozen.to_string();
    account.amount_total = amount_total.to_string();
    account.amount_rounded = round_price(&account.amount);
    account.amount_frozen_rounded = round_price(&account.amount_frozen);
    account.amount_total_rounded = round_price(&account.amount_total);
}

/// Pick the frozen balance across runtime representations: the unified
/// `frozen` field when present, else the larger of the two legacy sub-fields,
/// else whichever legacy sub-field exists.
fn resolve_frozen(balance: &AccountBalance) -> u128 {
    if let Some(frozen) = balance.frozen {
        return frozen;
    }
    match (balance.misc_frozen, balance.fee_frozen) {
        (Some(misc), Some(fee)) => misc.max(fee),
        (Some(misc), None) => misc,
        (None, Some(fee)) => fee,
        (None, None) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, MockClient};

    const UNIT: u128 = 1_000_000_000_000_000_000;

    fn config() -> ReconcileConfig {
        ReconcileConfig::default()
    }

    fn addresses(n: usize) -> BTreeSet<String> {
        (0..n).map(|i| format!("5Addr{i:03}")).collect()
    }

    fn simple_balance(free: u128) -> AccountBalance {
        AccountBalance {
            free,
            reserved: 0,
            frozen: None,
            misc_frozen: None,
            fee_frozen: None,
        }
    }

    #[test]
    fn test_resolve_frozen_prefers_unified_field() {
        let balance = AccountBalance {
            free: 0,
            reserved: 0,
            frozen: Some(5),
            misc_frozen: Some(10),
            fee_frozen: Some(20),
        };
        assert_eq!(resolve_frozen(&balance), 5);
    }

    #[test]
    fn test_resolve_frozen_takes_larger_legacy_field() {
        let balance = AccountBalance {
            frozen: None,
            misc_frozen: Some(10),
            fee_frozen: Some(20),
            ..simple_balance(0)
        };
        assert_eq!(resolve_frozen(&balance), 20);

        let balance = AccountBalance {
            frozen: None,
            misc_frozen: Some(30),
            fee_frozen: None,
            ..simple_balance(0)
        };
        assert_eq!(resolve_frozen(&balance), 30);

        assert_eq!(resolve_frozen(&simple_balance(0)), 0);
    }

    #[test]
    fn test_apply_balance_recomputes_rounded_fields() {
        let mut account = AccountRecord::new("5Alice", Utc::now());
        let balance = AccountBalance {
            free: 3 * UNIT,
            reserved: UNIT,
            frozen: Some(UNIT),
            misc_frozen: None,
            fee_frozen: None,
        };

        apply_balance(&mut account, &balance);
        assert_eq!(account.amount, (2 * UNIT).to_string());
        assert_eq!(account.amount_frozen, UNIT.to_string());
        assert_eq!(account.amount_total, (4 * UNIT).to_string());
        assert_eq!(account.amount_rounded, Some(2.0));
        assert_eq!(account.amount_frozen_rounded, Some(1.0));
        assert_eq!(account.amount_total_rounded, Some(4.0));
    }

    #[tokio::test]
    async fn test_below_threshold_accumulates_without_flush() {
        let client = MockClient::default();
        let store = MemoryStore::default();

        // height 1001 is off-cadence for the default cadence of 50
        reconcile_accounts(&client, &store, &config(), 1001, &addresses(99), Utc::now())
            .await
            .unwrap();

        assert_eq!(client.balance_query_count(), 0);
        assert_eq!(store.pending_accounts().len(), 99);
    }

    #[tokio::test]
    async fn test_threshold_reach_flushes_regardless_of_height() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        let all = addresses(100);
        for address in &all {
            client.set_balance(address, simple_balance(UNIT));
        }

        // seed 99 pending, then one more pushes the set to the threshold
        store.seed_pending_accounts(addresses(99));
        let one_more: BTreeSet<String> = addresses(100)
            .difference(&addresses(99))
            .cloned()
            .collect();

        reconcile_accounts(&client, &store, &config(), 1001, &one_more, Utc::now())
            .await
            .unwrap();

        assert_eq!(client.balance_query_count(), 1);
        assert!(store.pending_accounts().is_empty());
        assert_eq!(store.account_count(), 100);
        let account = store.account("5Addr042").unwrap();
        assert_eq!(account.amount_rounded, Some(1.0));
    }

    #[tokio::test]
    async fn test_cadence_height_flushes_non_empty_set() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        client.set_balance("5Alice", simple_balance(UNIT));

        let touched: BTreeSet<String> = [String::from("5Alice")].into();
        reconcile_accounts(&client, &store, &config(), 1000, &touched, Utc::now())
            .await
            .unwrap();

        assert_eq!(client.balance_query_count(), 1);
        assert!(store.pending_accounts().is_empty());
    }

    #[tokio::test]
    async fn test_cadence_height_with_empty_set_is_noop() {
        let client = MockClient::default();
        let store = MemoryStore::default();

        reconcile_accounts(&client, &store, &config(), 1000, &BTreeSet::new(), Utc::now())
            .await
            .unwrap();

        assert_eq!(client.balance_query_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_pending_set() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        client.fail_balance_queries(true);

        let touched: BTreeSet<String> = [String::from("5Alice")].into();
        reconcile_accounts(&client, &store, &config(), 1000, &touched, Utc::now())
            .await
            .unwrap();

        assert_eq!(store.pending_accounts(), vec!["5Alice".to_string()]);

        // the retry on a later cadence block succeeds and clears the set
        client.fail_balance_queries(false);
        client.set_balance("5Alice", simple_balance(UNIT));
        reconcile_accounts(&client, &store, &config(), 1050, &BTreeSet::new(), Utc::now())
            .await
            .unwrap();

        assert!(store.pending_accounts().is_empty());
        assert!(store.account("5Alice").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_addresses_collapse() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        store.seed_pending_accounts(["5Alice".to_string()].into_iter().collect());

        let touched: BTreeSet<String> = [String::from("5Alice")].into();
        reconcile_accounts(&client, &store, &config(), 1001, &touched, Utc::now())
            .await
            .unwrap();

        assert_eq!(store.pending_accounts(), vec!["5Alice".to_string()]);
    }

    #[tokio::test]
    async fn test_flush_chunks_by_batch_size() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        let config = ReconcileConfig {
            flush_threshold: 10,
            balance_batch_size: 4,
            ..ReconcileConfig::default()
        };
        let touched = addresses(10);
        for address in &touched {
            client.set_balance(address, simple_balance(UNIT));
        }

        reconcile_accounts(&client, &store, &config, 1001, &touched, Utc::now())
            .await
            .unwrap();

        // 10 addresses in batches of 4 => 3 queries
        assert_eq!(client.balance_query_count(), 3);
        assert_eq!(store.account_count(), 10);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let client = MockClient::default();
        let store = MemoryStore::default();
        let created_at = Utc::now() - chrono::Duration::hours(1);
        store.seed_account(AccountRecord::new("5Alice", created_at));
        client.set_balance("5Alice", simple_balance(2 * UNIT));

        let touched: BTreeSet<String> = [String::from("5Alice")].into();
        reconcile_accounts(&client, &store, &config(), 1000, &touched, Utc::now())
            .await
            .unwrap();

        let account = store.account("5Alice").unwrap();
        assert_eq!(account.created_at, created_at);
        assert!(account.updated_at > created_at);
        assert_eq!(account.amount_rounded, Some(2.0));
    }
}
