//! Time-bounded cache over a single store key.
//!
//! Freshness is decided by the caller: `read` returns whatever is stored,
//! fresh or stale, so endpoints can fall back to stale data when a refresh
//! fails.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;
use forecast_common::Clock;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::store::{CacheEntry, DocumentStore};

#[derive(Clone)]
pub struct DocumentCache {
    store: Arc<dyn DocumentStore>,
    key: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DocumentCache {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        key: impl Into<String>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
            clock,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Same store, TTL and clock under a different key.
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Stored entry, if any. Store failures are logged and read as a miss.
    pub async fn read(&self) -> Option<CacheEntry> {
        match self.store.get(&self.key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %self.key, backend = self.store.name(), error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// True while the entry is younger than the TTL.
    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let age = self.clock.now() - entry.created_at;
        age < self.ttl
    }

    /// Fresh entry only.
    pub async fn read_fresh(&self) -> Option<CacheEntry> {
        self.read().await.filter(|entry| self.is_fresh(entry))
    }

    /// Replace the stored entry, stamped with the current time.
    pub async fn write(&self, document: Bytes) -> StorageResult<CacheEntry> {
        let entry = CacheEntry::new(document, self.clock.now());
        self.store.put(&self.key, entry.clone()).await?;
        debug!(key = %self.key, bytes = entry.document.len(), "Cache entry written");
        Ok(entry)
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("backend", &self.store.name())
            .field("key", &self.key)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}
