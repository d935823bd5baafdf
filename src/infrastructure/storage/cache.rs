// In-memory TTL cache using DashMap
use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// A live entry as seen at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Value,
    pub age: Duration,
    pub ttl: Duration,
}

/// Thread-safe cache keyed by `action?params`
///
/// Entries are readable only while younger than their TTL. Expired entries
/// are dropped on read and by `sweep`. Every mutation bumps a revision
/// counter that the persister watches.
pub struct CacheStore {
    map: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    revision: watch::Sender<u64>,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            map: DashMap::new(),
            default_ttl,
            revision,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.map.get(key) {
            if entry.is_fresh(now) {
                return Some(entry.value.clone());
            }
        }
        // guard dropped above; expired or missing
        if self
            .map
            .remove_if(key, |_, entry| !entry.is_fresh(now))
            .is_some()
        {
            debug!(key, "cache entry expired");
            self.touch();
        }
        None
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.map.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
        self.touch();
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let existed = self.map.remove(key).is_some();
        if existed {
            self.touch();
        }
        existed
    }

    pub fn clear(&self) -> usize {
        let count = self.map.len();
        self.map.clear();
        self.touch();
        count
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_fresh(now));
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            debug!(removed, "cache sweep");
            self.touch();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        let now = Instant::now();
        self.map
            .iter()
            .filter(|e| e.value().is_fresh(now))
            .map(|e| SnapshotEntry {
                key: e.key().clone(),
                value: e.value().value.clone(),
                age: now.saturating_duration_since(e.value().stored_at),
                ttl: e.value().ttl,
            })
            .collect()
    }

    /// Load persisted entries, skipping any that are already past their TTL.
    /// Restored entries keep only their remaining lifetime.
    pub fn restore(&self, entries: Vec<SnapshotEntry>) -> usize {
        let now = Instant::now();
        let mut restored = 0;
        for entry in entries {
            if entry.age >= entry.ttl {
                continue;
            }
            self.map.insert(
                entry.key,
                CacheEntry {
                    value: entry.value,
                    stored_at: now,
                    ttl: entry.ttl - entry.age,
                },
            );
            restored += 1;
        }
        restored
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn touch(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
