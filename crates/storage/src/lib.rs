//! Storage abstractions for the forecast proxy.
//!
//! Provides:
//! - A key/value document store trait with filesystem and in-memory backends
//! - A TTL-bounded cache over one store key with stale reads

pub mod document_cache;
pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod store;

pub use document_cache::DocumentCache;
pub use error::{StorageError, StorageResult};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use store::{validate_key, CacheEntry, DocumentStore};
