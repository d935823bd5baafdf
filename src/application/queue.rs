//! Offline-aware priority queue with bounded retries.
//!
//! Every queued request moves through `Queued -> Executing` and then ends
//! `Resolved`, goes back to `Queued` after a backoff delay, or is
//! `Rejected`. Items drain one at a time, highest priority first and in
//! submission order within a priority, and only while the connectivity
//! signal reports online.

use crate::domain::error::RequestError;
use crate::domain::model::Priority;
use crate::infrastructure::network::connectivity::Connectivity;
use crate::infrastructure::storage::cache::CacheStore;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub type RequestThunk =
    Box<dyn Fn() -> BoxFuture<'static, Result<Value, RequestError>> + Send + Sync>;

pub type Reply = oneshot::Receiver<Result<Value, RequestError>>;

/// Immediate attempts allowed to run alongside the drain loop.
pub const DEFAULT_INTERACTIVE_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Linear,
    Exponential,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts already ran.
    /// Non-decreasing in `attempts` for both strategies.
    pub fn delay(&self, attempts: u32) -> Duration {
        let attempts = attempts.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempts),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempts - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Linear,
        }
    }
}

/// Work handed to the queue.
pub struct Job {
    pub thunk: RequestThunk,
    /// Written with the result on success
    pub cache_key: Option<String>,
    pub ttl: Duration,
    pub priority: Priority,
}

struct QueueItem {
    job: Job,
    seq: u64,
    submitted_at: Instant,
    not_before: Instant,
    attempts: u32,
    reply: oneshot::Sender<Result<Value, RequestError>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub attempts: u64,
    pub resolved: u64,
    pub requeued: u64,
    pub rejected: u64,
}

#[derive(Default)]
struct QueueState {
    items: Vec<QueueItem>,
    next_seq: u64,
    stats: QueueStats,
}

impl QueueState {
    fn admit(&mut self, job: Job) -> (QueueItem, Reply) {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let item = QueueItem {
            job,
            seq: self.next_seq,
            submitted_at: now,
            not_before: now,
            attempts: 0,
            reply: tx,
        };
        self.next_seq += 1;
        self.stats.enqueued += 1;
        (item, rx)
    }

    /// Remove the best ready item, or report when the next one becomes ready.
    fn take_ready(&mut self, now: Instant) -> Result<QueueItem, Option<Instant>> {
        self.items.retain(|item| !item.reply.is_closed());

        let best = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.not_before <= now)
            .min_by_key(|(_, item)| (item.job.priority, item.seq))
            .map(|(idx, _)| idx);

        match best {
            Some(idx) => Ok(self.items.remove(idx)),
            None => Err(self.items.iter().map(|item| item.not_before).min()),
        }
    }
}

pub struct RequestQueue {
    state: Mutex<QueueState>,
    wake: Notify,
    interactive: Semaphore,
    cache: Arc<CacheStore>,
    connectivity: Connectivity,
    policy: RetryPolicy,
}

impl RequestQueue {
    pub fn new(cache: Arc<CacheStore>, connectivity: Connectivity, policy: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            interactive: Semaphore::new(DEFAULT_INTERACTIVE_WORKERS),
            cache,
            connectivity,
            policy,
        }
    }

    /// Cap how many `attempt_now` first tries may run at once (at least one).
    pub fn with_interactive_workers(mut self, workers: usize) -> Self {
        self.interactive = Semaphore::new(workers.max(1));
        self
    }

    /// Queue `job` for the drain loop.
    pub fn enqueue(&self, job: Job) -> Reply {
        let priority = job.priority;
        let mut state = self.lock();
        let (item, rx) = state.admit(job);
        debug!(seq = item.seq, %priority, "request queued");
        state.items.push(item);
        drop(state);
        self.wake.notify_one();
        rx
    }

    /// Run the first attempt of `job` right away, bypassing the ordering.
    ///
    /// At most `interactive_workers` first tries run concurrently. A
    /// retryable failure puts the job into the queue like any other
    /// requeue, so the returned result is the final outcome.
    pub async fn attempt_now(&self, job: Job) -> Result<Value, RequestError> {
        // the semaphore is never closed
        let permit = self.interactive.acquire().await.ok();
        let (item, rx) = self.lock().admit(job);
        self.execute(item).await;
        drop(permit);
        wait(rx).await
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }

    /// Drain loop. Runs until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        let mut online = self.connectivity.subscribe();
        loop {
            if !*online.borrow_and_update() {
                info!(queued = self.len(), "queue paused while offline");
                if online.wait_for(|up| *up).await.is_err() {
                    return;
                }
                info!(queued = self.len(), "queue resumed");
                continue;
            }

            let next = self.lock().take_ready(Instant::now());
            match next {
                Ok(item) => self.execute(item).await,
                Err(wake_at) => {
                    let backoff = async {
                        match wake_at {
                            Some(at) => tokio::time::sleep_until(at).await,
                            None => std::future::pending::<()>().await,
                        }
                    };
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = backoff => {}
                        _ = online.changed() => {}
                    }
                }
            }
        }
    }

    async fn execute(&self, mut item: QueueItem) {
        item.attempts += 1;
        self.lock().stats.attempts += 1;
        debug!(
            seq = item.seq,
            attempt = item.attempts,
            priority = %item.job.priority,
            waited_ms = item.submitted_at.elapsed().as_millis() as u64,
            "executing request"
        );

        let result = (item.job.thunk)().await;

        match result {
            Ok(value) => {
                if let Some(key) = &item.job.cache_key {
                    self.cache.set(key, value.clone(), item.job.ttl);
                }
                self.lock().stats.resolved += 1;
                let _ = item.reply.send(Ok(value));
            }
            Err(e) if e.is_retryable() && item.attempts < self.policy.max_attempts => {
                let delay = self.policy.delay(item.attempts);
                warn!(
                    seq = item.seq,
                    attempt = item.attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "request failed, retrying"
                );
                item.not_before = Instant::now() + delay;
                let mut state = self.lock();
                state.stats.requeued += 1;
                state.items.push(item);
                drop(state);
                self.wake.notify_one();
            }
            Err(e) => {
                warn!(seq = item.seq, attempts = item.attempts, error = %e, "request rejected");
                self.lock().stats.rejected += 1;
                let _ = item.reply.send(Err(e));
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Await a queued reply, mapping a dropped queue to `Abandoned`.
pub async fn wait(reply: Reply) -> Result<Value, RequestError> {
    reply
        .await
        .map_err(|_| RequestError::Abandoned("request queue shut down".to_string()))?
}
