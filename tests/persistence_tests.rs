//! SQLite snapshot and preference storage

use folio::application::maintenance::{flush, hydrate, run_persister};
use folio::domain::model::Preferences;
use folio::infrastructure::storage::cache::{CacheStore, SnapshotEntry};
use folio::infrastructure::storage::db::{
    init_memory_database, load_preferences, load_snapshot, save_preferences, save_snapshot,
    snapshot_len, SNAPSHOT_SCHEMA_VERSION,
};
use rusqlite::params;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_rusqlite::Connection;

async fn insert_raw(db: &Connection, key: &str, data: Vec<u8>, age_ms: i64, ttl_ms: i64, version: i64) {
    let key = key.to_string();
    let stored_at = chrono::Utc::now().timestamp_millis() - age_ms;
    db.call(move |conn| {
        conn.execute(
            "INSERT OR REPLACE INTO cache_snapshot (key, data, stored_at, ttl_ms, schema_version)
             VALUES (?, ?, ?, ?, ?)",
            params![key, data, stored_at, ttl_ms, version],
        )?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
    .unwrap();
}

fn compressed(value: serde_json::Value) -> Vec<u8> {
    zstd::stream::encode_all(value.to_string().as_bytes(), 0).unwrap()
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let db = init_memory_database().await.unwrap();
    let entries = vec![
        SnapshotEntry {
            key: "getProfile".into(),
            value: json!({ "name": "Ada", "skills": ["rust", "sql"] }),
            age: Duration::from_secs(5),
            ttl: Duration::from_secs(300),
        },
        SnapshotEntry {
            key: "getProjects?page=2".into(),
            value: json!([1, 2, 3]),
            age: Duration::ZERO,
            ttl: Duration::from_secs(60),
        },
    ];

    assert_eq!(save_snapshot(&db, entries).await.unwrap(), 2);
    assert_eq!(snapshot_len(&db).await.unwrap(), 2);

    let mut loaded = load_snapshot(&db).await;
    loaded.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].key, "getProfile");
    assert_eq!(loaded[0].value, json!({ "name": "Ada", "skills": ["rust", "sql"] }));
    assert!(loaded[0].age >= Duration::from_secs(5));
    assert_eq!(loaded[0].ttl, Duration::from_secs(300));
    assert_eq!(loaded[1].value, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_save_replaces_previous_snapshot() {
    let db = init_memory_database().await.unwrap();
    let entry = |key: &str| SnapshotEntry {
        key: key.into(),
        value: json!(key),
        age: Duration::ZERO,
        ttl: Duration::from_secs(60),
    };

    save_snapshot(&db, vec![entry("a"), entry("b")]).await.unwrap();
    save_snapshot(&db, vec![entry("c")]).await.unwrap();

    let loaded = load_snapshot(&db).await;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key, "c");
}

#[tokio::test]
async fn test_unusable_rows_are_skipped() {
    let db = init_memory_database().await.unwrap();
    insert_raw(&db, "good", compressed(json!("ok")), 1_000, 60_000, SNAPSHOT_SCHEMA_VERSION).await;
    insert_raw(&db, "expired", compressed(json!("old")), 61_000, 60_000, SNAPSHOT_SCHEMA_VERSION).await;
    insert_raw(&db, "future-format", compressed(json!("v2")), 0, 60_000, SNAPSHOT_SCHEMA_VERSION + 1).await;
    insert_raw(&db, "corrupt", b"definitely not zstd".to_vec(), 0, 60_000, SNAPSHOT_SCHEMA_VERSION).await;

    let loaded = load_snapshot(&db).await;

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key, "good");
    assert_eq!(loaded[0].value, json!("ok"));
}

#[tokio::test]
async fn test_missing_table_loads_empty() {
    let db = Connection::open_in_memory().await.unwrap();
    assert!(load_snapshot(&db).await.is_empty());
}

#[tokio::test]
async fn test_flush_then_hydrate() {
    let db = init_memory_database().await.unwrap();
    let cache = CacheStore::new(Duration::from_secs(60));
    cache.set("getSkills", json!(["rust"]), Duration::from_secs(60));
    cache.set("getProfile", json!({ "name": "Ada" }), Duration::from_secs(60));

    assert_eq!(flush(&cache, &db).await.unwrap(), 2);

    let restarted = CacheStore::new(Duration::from_secs(60));
    assert_eq!(hydrate(&restarted, &db).await, 2);
    assert_eq!(restarted.get("getSkills"), Some(json!(["rust"])));
    assert_eq!(restarted.get("getProfile"), Some(json!({ "name": "Ada" })));
}

#[tokio::test]
async fn test_flush_after_clear_empties_snapshot() {
    let db = init_memory_database().await.unwrap();
    let cache = CacheStore::new(Duration::from_secs(60));
    cache.set("getSkills", json!(["rust"]), Duration::from_secs(60));
    flush(&cache, &db).await.unwrap();

    // --clear-cache followed by a failing command still flushes on the way out
    assert_eq!(cache.clear(), 1);
    assert_eq!(flush(&cache, &db).await.unwrap(), 0);

    let restarted = CacheStore::new(Duration::from_secs(60));
    assert_eq!(hydrate(&restarted, &db).await, 0);
    assert!(restarted.get("getSkills").is_none());
}

#[tokio::test]
async fn test_persister_writes_after_quiet_period() {
    let db = Arc::new(init_memory_database().await.unwrap());
    let cache = Arc::new(CacheStore::new(Duration::from_secs(60)));
    let task = tokio::spawn(run_persister(
        Arc::clone(&cache),
        Arc::clone(&db),
        Duration::from_millis(50),
    ));
    // let the persister subscribe before the burst
    tokio::time::sleep(Duration::from_millis(10)).await;

    for i in 0..5 {
        cache.set(&format!("key-{}", i), json!(i), Duration::from_secs(60));
    }
    assert_eq!(snapshot_len(&db).await.unwrap(), 0);

    let mut persisted = 0;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        persisted = snapshot_len(&db).await.unwrap();
        if persisted == 5 {
            break;
        }
    }
    assert_eq!(persisted, 5);
    task.abort();
}

#[tokio::test]
async fn test_preferences_default_and_saved() {
    let db = init_memory_database().await.unwrap();
    let defaults = Preferences {
        theme: "dark".into(),
        language: "en".into(),
    };

    let prefs = load_preferences(&db, defaults.clone()).await.unwrap();
    assert_eq!(prefs, defaults);

    let updated = Preferences {
        theme: "plain".into(),
        language: "de".into(),
    };
    save_preferences(&db, &updated).await.unwrap();
    assert_eq!(load_preferences(&db, defaults).await.unwrap(), updated);
}
