use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Caps calls to at most one per `interval` for each key.
pub struct Throttle {
    interval: Duration,
    last: DashMap<String, Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: DashMap::new(),
        }
    }

    /// Returns true if the caller may proceed now, recording the call.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        match self.last.entry(key.to_string()) {
            Entry::Occupied(mut last) => {
                if now.saturating_duration_since(*last.get()) >= self.interval {
                    last.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }
}

/// Wait for the next burst of changes on `rx` and return the latest value
/// once no further change has arrived for `quiet`.
///
/// Returns `None` when the sender is gone and nothing changed since the
/// last call. A sender dropped mid-burst still yields the latest value.
pub async fn debounce<T: Clone>(rx: &mut watch::Receiver<T>, quiet: Duration) -> Option<T> {
    rx.changed().await.ok()?;
    loop {
        match tokio::time::timeout(quiet, rx.changed()).await {
            Ok(Ok(())) => continue,
            Ok(Err(_)) | Err(_) => break,
        }
    }
    let latest = rx.borrow_and_update().clone();
    Some(latest)
}
