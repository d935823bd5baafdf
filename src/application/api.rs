use crate::application::queue::{self, Job, RequestQueue};
use crate::application::single_flight::SingleFlight;
use crate::domain::error::RequestError;
use crate::domain::model::{DataSource, FetchOptions, Fetched, Priority};
use crate::infrastructure::network::connectivity::Connectivity;
use crate::infrastructure::network::executor::RequestExecutor;
use crate::infrastructure::storage::cache::CacheStore;
use futures_util::future::{join_all, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache key for an action and its parameters, independent of parameter order.
pub fn cache_key(action: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return action.to_string();
    }
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", action, query)
}

/// Client for the portfolio endpoint's read path.
#[derive(Clone)]
pub struct PortfolioApi {
    executor: Arc<RequestExecutor>,
    cache: Arc<CacheStore>,
    queue: Arc<RequestQueue>,
    flights: Arc<SingleFlight>,
    connectivity: Connectivity,
    timeout: Duration,
}

impl PortfolioApi {
    pub fn new(
        executor: Arc<RequestExecutor>,
        cache: Arc<CacheStore>,
        queue: Arc<RequestQueue>,
        connectivity: Connectivity,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            cache,
            queue,
            flights: Arc::new(SingleFlight::new()),
            connectivity,
            timeout,
        }
    }

    /// Fetch `action` with `params`.
    ///
    /// 1. Cache hit (unless `force_refresh`)
    /// 2. Join an identical in-flight fetch, or start one:
    ///    offline or low-priority fetches wait in the queue, others are
    ///    attempted at once and fall back to the queue for retries.
    pub async fn fetch_data(
        &self,
        action: &str,
        params: &[(String, String)],
        options: FetchOptions,
    ) -> Result<Fetched, RequestError> {
        if !options.force_refresh {
            if let Some(hit) = self.cached(action, params) {
                return Ok(hit);
            }
        }

        let key = cache_key(action, params);
        let online = self.connectivity.is_online();

        let job = self.job(action, params, &key, &options);
        let queue = Arc::clone(&self.queue);
        let queued = !online || options.priority == Priority::Low;
        let work = async move {
            if queued {
                queue::wait(queue.enqueue(job)).await
            } else {
                queue.attempt_now(job).await
            }
        };

        let value = self.flights.run(&key, work).await?;
        Ok(Fetched {
            value,
            source: DataSource::Network,
        })
    }

    /// Cached value for `action` with `params`, never touching the network.
    pub fn cached(&self, action: &str, params: &[(String, String)]) -> Option<Fetched> {
        let key = cache_key(action, params);
        let value = self.cache.get(&key)?;
        let source = if self.connectivity.is_online() {
            DataSource::Cache
        } else {
            DataSource::OfflineCache
        };
        debug!(key = %key, ?source, "cache hit");
        Some(Fetched { value, source })
    }

    /// Fetch several parameterless section actions concurrently.
    /// A failed section does not affect the others.
    pub async fn load_sections(
        &self,
        actions: &[String],
    ) -> Vec<(String, Result<Fetched, RequestError>)> {
        let fetches = actions.iter().map(|action| {
            self.fetch_data(action, &[], FetchOptions::with_priority(Priority::High))
                .map(move |result| (action.clone(), result))
        });
        join_all(fetches).await
    }

    pub fn invalidate(&self, action: &str, params: &[(String, String)]) -> bool {
        self.cache.invalidate(&cache_key(action, params))
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    fn job(&self, action: &str, params: &[(String, String)], key: &str, options: &FetchOptions) -> Job {
        let executor = Arc::clone(&self.executor);
        let action = action.to_string();
        let params = params.to_vec();
        let timeout = self.timeout;
        Job {
            thunk: Box::new(move || {
                let executor = Arc::clone(&executor);
                let action = action.clone();
                let params = params.clone();
                async move { executor.execute(&action, &params, timeout).await }.boxed()
            }),
            cache_key: Some(key.to_string()),
            ttl: options.ttl.unwrap_or_else(|| self.cache.default_ttl()),
            priority: options.priority,
        }
    }
}
