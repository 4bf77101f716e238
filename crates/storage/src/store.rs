//! Document store trait and cache entry type.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};

/// A stored document and the instant it was produced.
///
/// Entries are replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub document: Bytes,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(document: Bytes, created_at: DateTime<Utc>) -> Self {
        Self {
            document,
            created_at,
        }
    }
}

/// Key/value store for serialized documents.
///
/// `put` must be atomic with respect to concurrent `get`s: a reader sees
/// either the previous entry or the new one, never a partial write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>>;

    async fn put(&self, key: &str, entry: CacheEntry) -> StorageResult<()>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("forecast_2d").is_ok());
        assert!(validate_key("marine").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a b").is_err());
    }
}
