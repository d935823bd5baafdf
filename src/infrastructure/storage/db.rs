use crate::domain::error::FolioError;
use crate::domain::model::Preferences;
use crate::infrastructure::storage::cache::SnapshotEntry;
use rusqlite::params;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio_rusqlite::Connection;
use tracing::debug;
use zstd::stream::{decode_all, encode_all};

/// Bumped whenever the row encoding changes; rows of another version are ignored on load.
pub const SNAPSHOT_SCHEMA_VERSION: i64 = 1;

pub async fn init_database(db_path: &Path) -> Result<Connection, FolioError> {
    let db = Connection::open(db_path.to_path_buf()).await?;
    create_schema(&db).await?;
    Ok(db)
}

pub async fn init_memory_database() -> Result<Connection, FolioError> {
    let db = Connection::open_in_memory().await?;
    create_schema(&db).await?;
    Ok(db)
}

async fn create_schema(db: &Connection) -> Result<(), FolioError> {
    db.call(|conn| {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_snapshot (
                key TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                ttl_ms INTEGER NOT NULL,
                schema_version INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(())
}

struct SnapshotRow {
    key: String,
    data: Vec<u8>,
    stored_at: i64,
    ttl_ms: i64,
    schema_version: i64,
}

/// Replace the persisted snapshot with `entries`.
pub async fn save_snapshot(db: &Connection, entries: Vec<SnapshotEntry>) -> Result<usize, FolioError> {
    let now_ms = chrono::Utc::now().timestamp_millis();

    let mut prepared = Vec::with_capacity(entries.len());
    for entry in entries {
        let serialized = serde_json::to_vec(&entry.value)?;
        let compressed = encode_all(Cursor::new(&serialized), 0)?;
        let stored_at = now_ms - entry.age.as_millis() as i64;
        prepared.push((entry.key, compressed, stored_at, entry.ttl.as_millis() as i64));
    }

    let written = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM cache_snapshot", [])?;
            let mut count = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO cache_snapshot (key, data, stored_at, ttl_ms, schema_version)
                     VALUES (?, ?, ?, ?, ?)",
                )?;
                for (key, data, stored_at, ttl_ms) in prepared {
                    stmt.execute(params![key, data, stored_at, ttl_ms, SNAPSHOT_SCHEMA_VERSION])?;
                    count += 1;
                }
            }
            tx.commit()?;
            Ok::<_, rusqlite::Error>(count)
        })
        .await?;

    Ok(written)
}

/// Read the persisted snapshot.
///
/// Never fails: a missing table, an unreadable row, a row from another
/// schema version or an already expired row is dropped with a debug log.
pub async fn load_snapshot(db: &Connection) -> Vec<SnapshotEntry> {
    let rows = db
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, data, stored_at, ttl_ms, schema_version FROM cache_snapshot",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SnapshotRow {
                        key: row.get(0)?,
                        data: row.get(1)?,
                        stored_at: row.get(2)?,
                        ttl_ms: row.get(3)?,
                        schema_version: row.get(4)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect::<Vec<_>>();
            Ok::<_, rusqlite::Error>(rows)
        })
        .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            debug!(error = %e, "cache snapshot unreadable, starting empty");
            return Vec::new();
        }
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    rows.into_iter()
        .filter_map(|row| decode_row(row, now_ms))
        .collect()
}

fn decode_row(row: SnapshotRow, now_ms: i64) -> Option<SnapshotEntry> {
    if row.schema_version != SNAPSHOT_SCHEMA_VERSION {
        debug!(key = %row.key, version = row.schema_version, "skipping snapshot row from another schema");
        return None;
    }
    if row.ttl_ms <= 0 {
        return None;
    }
    let age_ms = (now_ms - row.stored_at).max(0);
    if age_ms >= row.ttl_ms {
        return None;
    }

    let value = decode_all(Cursor::new(&row.data))
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_slice(&raw).map_err(|e| e.to_string()));
    match value {
        Ok(value) => Some(SnapshotEntry {
            key: row.key,
            value,
            age: Duration::from_millis(age_ms as u64),
            ttl: Duration::from_millis(row.ttl_ms as u64),
        }),
        Err(e) => {
            debug!(key = %row.key, error = %e, "dropping corrupt snapshot row");
            None
        }
    }
}

pub async fn snapshot_len(db: &Connection) -> Result<usize, FolioError> {
    let count: i64 = db
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM cache_snapshot", [], |row| row.get(0)))
        .await?;

    Ok(count as usize)
}

/// Stored preferences, with `defaults` filling anything never saved.
pub async fn load_preferences(
    db: &Connection,
    defaults: Preferences,
) -> Result<Preferences, FolioError> {
    use rusqlite::OptionalExtension;

    let (theme, language) = db
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM preferences WHERE name = ?")?;
            let theme: Option<String> = stmt
                .query_row(params!["theme"], |row| row.get(0))
                .optional()?;
            let language: Option<String> = stmt
                .query_row(params!["language"], |row| row.get(0))
                .optional()?;
            Ok::<_, rusqlite::Error>((theme, language))
        })
        .await?;

    Ok(Preferences {
        theme: theme.unwrap_or(defaults.theme),
        language: language.unwrap_or(defaults.language),
    })
}

pub async fn save_preferences(db: &Connection, prefs: &Preferences) -> Result<(), FolioError> {
    let theme = prefs.theme.clone();
    let language = prefs.language.clone();

    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO preferences (name, value) VALUES ('theme', ?)",
            params![theme],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO preferences (name, value) VALUES ('language', ?)",
            params![language],
        )?;
        tx.commit()?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(())
}
