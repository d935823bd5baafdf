// Background upkeep for the cache store
use crate::application::pacing::debounce;
use crate::domain::error::FolioError;
use crate::infrastructure::storage::cache::CacheStore;
use crate::infrastructure::storage::db::{load_snapshot, save_snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

/// Drop expired entries every `interval`.
pub async fn run_sweeper(cache: Arc<CacheStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        cache.sweep();
    }
}

/// Fill `cache` from the persisted snapshot. Never fails.
pub async fn hydrate(cache: &CacheStore, db: &Connection) -> usize {
    let entries = load_snapshot(db).await;
    let restored = cache.restore(entries);
    info!(restored, "cache hydrated from snapshot");
    restored
}

pub async fn flush(cache: &CacheStore, db: &Connection) -> Result<usize, FolioError> {
    let written = save_snapshot(db, cache.snapshot()).await?;
    debug!(written, "cache snapshot saved");
    Ok(written)
}

/// Save a snapshot whenever a burst of cache mutations has been quiet for `quiet`.
pub async fn run_persister(cache: Arc<CacheStore>, db: Arc<Connection>, quiet: Duration) {
    let mut revisions = cache.subscribe();
    while debounce(&mut revisions, quiet).await.is_some() {
        if let Err(e) = flush(&cache, &db).await {
            warn!(error = %e, "failed to persist cache snapshot");
        }
    }
}
