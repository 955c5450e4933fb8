//! Shared state threaded through block processing.

use std::sync::RwLock;

use avail_indexer_config::IndexerConfig;

use crate::client::ChainClient;
use crate::store::Store;

/// Everything one block invocation needs: the collaborators, the process
/// configuration, and the spec-version single-slot cache.
///
/// The cache is only sound because blocks are processed one at a time; it is
/// a `RwLock` rather than a global so tests can construct and observe it
/// deterministically.
pub struct IndexerState<C, S> {
    pub client: C,
    pub store: S,
    pub config: IndexerConfig,
    spec_version: RwLock<Option<u32>>,
}

impl<C: ChainClient, S: Store> IndexerState<C, S> {
    pub fn new(client: C, store: S, config: IndexerConfig) -> Self {
        Self {
            client,
            store,
            config,
            spec_version: RwLock::new(None),
        }
    }

    /// Last runtime version this process observed, if any.
    pub fn cached_spec_version(&self) -> Option<u32> {
        self.spec_version.read().ok().and_then(|guard| *guard)
    }

    pub fn set_cached_spec_version(&self, version: u32) {
        if let Ok(mut guard) = self.spec_version.write() {
            *guard = Some(version);
        }
    }
}
