use crate::domain::error::RequestError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type Flight = Shared<BoxFuture<'static, Result<Value, RequestError>>>;

/// At most one in-flight fetch per key; concurrent callers share its outcome.
///
/// The work runs on its own task, so it settles and leaves the map even if
/// every caller stops waiting.
#[derive(Default)]
pub struct SingleFlight {
    inflight: Arc<DashMap<String, Flight>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F>(&self, key: &str, work: F) -> Result<Value, RequestError>
    where
        F: Future<Output = Result<Value, RequestError>> + Send + 'static,
    {
        let flight = match self.inflight.entry(key.to_string()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let inflight = Arc::clone(&self.inflight);
                let owned_key = key.to_string();
                let handle = tokio::spawn(async move {
                    let result = work.await;
                    inflight.remove(&owned_key);
                    result
                });
                let flight = async move {
                    handle
                        .await
                        .unwrap_or_else(|e| Err(RequestError::Abandoned(e.to_string())))
                }
                .boxed()
                .shared();
                slot.insert(flight.clone());
                flight
            }
        };
        flight.await
    }
}
