//! Scripted transport shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use folio::application::api::PortfolioApi;
use folio::application::queue::{RequestQueue, RetryPolicy};
use folio::domain::error::RequestError;
use folio::domain::model::{HttpReply, HttpRequest, Method};
use folio::domain::traits::Transport;
use folio::infrastructure::network::connectivity::Connectivity;
use folio::infrastructure::network::executor::{ApiLog, RequestExecutor};
use folio::infrastructure::storage::cache::CacheStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ENDPOINT: &str = "https://portfolio.test/exec";

type Handler = Box<dyn Fn(&HttpRequest, usize) -> Result<HttpReply, RequestError> + Send + Sync>;

/// Answers every request through `handler`, which also receives how many
/// earlier requests carried the same `action` (or URL, when there is none).
pub struct FakeTransport {
    handler: Handler,
    delay: Duration,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest, usize) -> Result<HttpReply, RequestError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_for(&self, action: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.query_param("action") == Some(action))
            .count()
    }

    pub fn posts(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .collect()
    }
}

fn route(request: &HttpRequest) -> String {
    request
        .query_param("action")
        .map(|a| a.to_string())
        .unwrap_or_else(|| request.url.clone())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, RequestError> {
        let seen = {
            let mut requests = self.requests.lock().unwrap();
            let key = route(&request);
            let seen = requests.iter().filter(|r| route(r) == key).count();
            requests.push(request.clone());
            seen
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request, seen)
    }
}

pub fn json_reply(body: serde_json::Value) -> Result<HttpReply, RequestError> {
    Ok(HttpReply::ok(body.to_string()))
}

pub fn status_reply(status: u16) -> Result<HttpReply, RequestError> {
    Ok(HttpReply {
        status,
        body: String::new(),
    })
}

pub fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(5),
        ..RetryPolicy::default()
    }
}

pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub cache: Arc<CacheStore>,
    pub queue: Arc<RequestQueue>,
    pub connectivity: Connectivity,
    pub log: Arc<ApiLog>,
    pub api: PortfolioApi,
}

/// API client wired around `transport`, with the drain loop running.
pub fn harness(transport: FakeTransport, policy: RetryPolicy, timeout: Duration) -> Harness {
    let transport = Arc::new(transport);
    let cache = Arc::new(CacheStore::new(Duration::from_secs(60)));
    let connectivity = Connectivity::new(true);
    let queue = Arc::new(RequestQueue::new(
        Arc::clone(&cache),
        connectivity.clone(),
        policy,
    ));
    let log = Arc::new(ApiLog::default());
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let executor = Arc::new(RequestExecutor::new(
        dyn_transport,
        ENDPOINT,
        "folio-test/1.0",
        Arc::clone(&log),
    ));
    let api = PortfolioApi::new(
        executor,
        Arc::clone(&cache),
        Arc::clone(&queue),
        connectivity.clone(),
        timeout,
    );
    tokio::spawn(Arc::clone(&queue).run());

    Harness {
        transport,
        cache,
        queue,
        connectivity,
        log,
        api,
    }
}
