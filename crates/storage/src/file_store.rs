//! Filesystem document store.
//!
//! Each key is stored as `<dir>/<key>.json`. The entry's `created_at` is the
//! file modification time, so caches survive restarts and can be inspected
//! with ordinary tools.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, CacheEntry, DocumentStore};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.json.{}.{}.tmp", key, std::process::id(), n))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        validate_key(key)?;
        let path = self.path_for(key);

        // Bytes and mtime come from one handle so a concurrent rename cannot
        // pair old contents with a new timestamp.
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(io_error(&path, source)),
        };

        let modified = file
            .metadata()
            .await
            .and_then(|m| m.modified())
            .map_err(|source| io_error(&path, source))?;

        let mut document = Vec::new();
        file.read_to_end(&mut document)
            .await
            .map_err(|source| io_error(&path, source))?;

        Ok(Some(CacheEntry::new(
            Bytes::from(document),
            DateTime::<Utc>::from(modified),
        )))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        validate_key(key)?;
        let dir = self.dir.clone();
        let temp = self.temp_path_for(key);
        let target = self.path_for(key);

        debug!(path = %target.display(), bytes = entry.document.len(), "Writing cache file");

        tokio::task::spawn_blocking(move || write_atomically(&dir, &temp, &target, &entry))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Write to a temp file in the same directory, stamp its mtime, then rename
/// over the target.
fn write_atomically(dir: &Path, temp: &Path, target: &Path, entry: &CacheEntry) -> StorageResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

    let result = write_temp(temp, entry)
        .and_then(|()| std::fs::rename(temp, target).map_err(|source| io_error(target, source)));

    if result.is_err() {
        let _ = std::fs::remove_file(temp);
    }
    result
}

fn write_temp(temp: &Path, entry: &CacheEntry) -> StorageResult<()> {
    let mut file = std::fs::File::create(temp).map_err(|source| io_error(temp, source))?;
    file.write_all(&entry.document)
        .and_then(|()| file.sync_all())
        .and_then(|()| file.set_modified(SystemTime::from(entry.created_at)))
        .map_err(|source| io_error(temp, source))
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}
