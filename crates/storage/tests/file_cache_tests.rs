//! DocumentCache over the filesystem store.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use forecast_common::FixedClock;
use storage::{CacheEntry, DocumentCache, DocumentStore, FileStore};

#[tokio::test]
async fn test_entry_survives_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap()));

    let cache = DocumentCache::new(
        Arc::new(FileStore::new(dir.path())),
        "marine",
        Duration::hours(1),
        clock.clone(),
    );
    let body = Bytes::from_static(b"{\"title\":\"Howe Sound\"}");
    cache.write(body.clone()).await.unwrap();

    // A restarted process sees the same bytes and creation time
    let reopened = DocumentCache::new(
        Arc::new(FileStore::new(dir.path())),
        "marine",
        Duration::hours(1),
        clock.clone(),
    );
    let entry = reopened.read().await.unwrap();
    assert_eq!(entry.document, body);
    assert!(reopened.is_fresh(&entry));

    clock.advance(Duration::hours(2));
    let stale = reopened.read().await.unwrap();
    assert!(!reopened.is_fresh(&stale));
    assert_eq!(stale.document, body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let cache = DocumentCache::new(store.clone(), "forecast_2d", Duration::hours(3), clock);

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.write(Bytes::from(format!("{{\"n\":{}}}", i))).await })
        })
        .collect();
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    if let Some(entry) = store.get("forecast_2d").await.unwrap() {
                        let json: serde_json::Value = serde_json::from_slice(&entry.document).unwrap();
                        assert!(json["n"].as_u64().unwrap() < 8);
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for handle in writers {
        handle.await.unwrap().unwrap();
    }
    for handle in readers {
        handle.await.unwrap();
    }

    // Whatever won, the file holds one complete document
    let entry = store.get("forecast_2d").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&entry.document).unwrap();
    assert!(json["n"].as_u64().unwrap() < 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_pairs_bytes_with_their_own_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let base = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..40i64 {
                let body = Bytes::from(format!("{{\"n\":{}}}", i));
                store
                    .put("marine", CacheEntry::new(body, base + Duration::seconds(i)))
                    .await
                    .unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..40 {
                    if let Some(entry) = store.get("marine").await.unwrap() {
                        let json: serde_json::Value = serde_json::from_slice(&entry.document).unwrap();
                        let n = json["n"].as_i64().unwrap();
                        assert_eq!(entry.created_at, base + Duration::seconds(n));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for handle in readers {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_unwritable_directory_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the cache directory should be
    let blocker = dir.path().join("cache");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let cache = DocumentCache::new(
        Arc::new(FileStore::new(&blocker)),
        "marine",
        Duration::hours(1),
        Arc::new(FixedClock::new(Utc::now())),
    );
    assert!(cache.write(Bytes::from_static(b"{}")).await.is_err());
    assert!(cache.read().await.is_none());
}
