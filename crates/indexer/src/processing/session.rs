//! Session and validator tracking.
//!
//! Session ids change rarely relative to block count, so the existence check
//! on the Session record gates the expensive validator-set fetch and account
//! fan-out. Everything here fails soft: a block without session metadata is
//! still a block.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::client::{ChainClient, ClientError};
use crate::entities::{AccountRecord, SessionRecord};
use crate::source::DigestLog;
use crate::store::{Store, StoreError};

use super::codec::strip_hex_prefix;

#[derive(Debug, Error)]
enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Session metadata attached to the in-progress block record.
#[derive(Debug, Default, PartialEq)]
pub struct SessionInfo {
    pub session_id: Option<u64>,
    pub author: Option<String>,
}

pub async fn update_session<C: ChainClient, S: Store>(
    client: &C,
    store: &S,
    logs: &[DigestLog],
    now: DateTime<Utc>,
) -> SessionInfo {
    match try_update_session(client, store, logs, now).await {
        Ok(info) => info,
        Err(err) => {
            tracing::error!(error = %err, "session update failed");
            SessionInfo::default()
        }
    }
}

async fn try_update_session<C: ChainClient, S: Store>(
    client: &C,
    store: &S,
    logs: &[DigestLog],
    now: DateTime<Utc>,
) -> Result<SessionInfo, SessionError> {
    let session_id = client.current_session_index().await?;

    let validators = match store.get_session(session_id).await? {
        Some(record) => record.validators,
        None => {
            let validators = client.session_validators().await?;
            store
                .save_session(&SessionRecord {
                    id: session_id,
                    validators: validators.clone(),
                })
                .await?;
            mark_validators(store, &validators, now).await?;
            tracing::info!(session_id, validators = validators.len(), "new session recorded");
            validators
        }
    };

    Ok(SessionInfo {
        session_id: Some(session_id),
        author: extract_author(logs, &validators),
    })
}

/// Flag every validator's account and bump its participation counter,
/// creating accounts not seen before.
async fn mark_validators<S: Store>(
    store: &S,
    validators: &[String],
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut created = Vec::new();
    let mut updated = Vec::new();

    for address in validators {
        match store.get_account(address).await? {
            Some(mut account) => {
                account.validator = true;
                account.validator_session_participated += 1;
                account.updated_at = now;
                updated.push(account);
            }
            None => {
                let mut account = AccountRecord::new(address, now);
                account.validator = true;
                account.validator_session_participated = 1;
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
    Ok(())
}

/// Resolve the block author from the consensus pre-runtime digest.
///
/// BABE pre-runtime payloads carry a variant byte followed by the LE u32
/// authority index; AURA payloads carry the LE u64 slot number, with the
/// author being validators[slot % len].
pub fn extract_author(logs: &[DigestLog], validators: &[String]) -> Option<String> {
    if validators.is_empty() {
        return None;
    }

    for log in logs {
        let DigestLog::PreRuntime { engine, data } = log else {
            continue;
        };
        let Ok(bytes) = hex::decode(strip_hex_prefix(data)) else {
            continue;
        };

        match engine.as_str() {
            "BABE" => {
                if bytes.len() >= 5 {
                    let index =
                        u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
                    return validators.get(index).cloned();
                }
            }
            "AURA" => {
                if bytes.len() >= 8 {
                    let slot = u64::from_le_bytes(bytes[..8].try_into().ok()?);
                    let index = (slot % validators.len() as u64) as usize;
                    return validators.get(index).cloned();
                }
            }
            _ => {}
        }
    }

    None
}
