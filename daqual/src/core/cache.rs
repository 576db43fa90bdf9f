//! Memoized resolution of object keys to table handles.

use super::TableHandle;
use crate::prelude::*;
use crate::provider::ObjectProvider;
use crate::table::Table;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Resolves object keys to [`TableHandle`]s, retrieving each key at most once.
///
/// The cache is scoped to a run: [`begin_run`](Self::begin_run) clears it
/// unless the caller opts into keeping tables across runs.
#[derive(Debug)]
pub struct ObjectCache {
    provider: Arc<dyn ObjectProvider>,
    handles: HashMap<String, TableHandle>,
    retrievals: usize,
    hits: usize,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of cached handles
    pub entries: usize,
    /// Provider retrievals performed since the last reset
    pub retrievals: usize,
    /// Resolutions served from the cache since the last reset
    pub hits: usize,
}

impl ObjectCache {
    pub fn new(provider: Arc<dyn ObjectProvider>) -> Self {
        Self {
            provider,
            handles: HashMap::new(),
            retrievals: 0,
            hits: 0,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ObjectProvider> {
        &self.provider
    }

    /// Prepares the cache for a new run.
    ///
    /// With `retain_tables` unset every handle is dropped, so the run
    /// re-fetches everything. With it set the tables are kept but every
    /// handle's scoring state is zeroed.
    pub fn begin_run(&mut self, retain_tables: bool) {
        if retain_tables {
            for handle in self.handles.values_mut() {
                handle.reset();
            }
        } else {
            self.handles.clear();
        }
        self.retrievals = 0;
        self.hits = 0;
    }

    /// Resolves a key, retrieving it through the provider on first use.
    ///
    /// Any provider failure comes back as [`DaqualError::Retrieval`].
    #[instrument(skip(self), fields(provider = %self.provider.description()))]
    pub async fn resolve(&mut self, object_key: &str) -> Result<&TableHandle> {
        if self.handles.contains_key(object_key) {
            self.hits += 1;
            debug!(object.key = %object_key, "Object already resolved");
        } else {
            let table = self
                .provider
                .retrieve(object_key)
                .await
                .map_err(|e| match e {
                    retrieval @ DaqualError::Retrieval { .. } => retrieval,
                    other => DaqualError::retrieval_with_source(
                        object_key,
                        "provider failed",
                        Box::new(other),
                    ),
                })?;
            self.retrievals += 1;
            info!(
                object.key = %object_key,
                rows = table.num_rows(),
                columns = table.num_columns(),
                "Retrieved and converted object"
            );
            self.handles
                .insert(object_key.to_string(), TableHandle::new(object_key, table));
        }
        self.handle(object_key)
    }

    pub fn contains(&self, object_key: &str) -> bool {
        self.handles.contains_key(object_key)
    }

    pub fn handle(&self, object_key: &str) -> Result<&TableHandle> {
        self.handles
            .get(object_key)
            .ok_or_else(|| DaqualError::ObjectNotResolved(object_key.to_string()))
    }

    pub(crate) fn handle_mut(&mut self, object_key: &str) -> Result<&mut TableHandle> {
        self.handles
            .get_mut(object_key)
            .ok_or_else(|| DaqualError::ObjectNotResolved(object_key.to_string()))
    }

    /// The table of a resolved object.
    pub fn table(&self, object_key: &str) -> Result<&Table> {
        self.handle(object_key).map(TableHandle::table)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.handles.len(),
            retrievals: self.retrievals,
            hits: self.hits,
        }
    }
}
