use crate::domain::error::RequestError;
use crate::domain::model::{ApiLogRecord, HttpRequest};
use crate::domain::traits::Transport;
use chrono::Utc;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

const API_LOG_CAPACITY: usize = 100;

/// Ring of the most recent executions, newest last
#[derive(Default)]
pub struct ApiLog {
    records: Mutex<VecDeque<ApiLogRecord>>,
}

impl ApiLog {
    pub fn push(&self, record: ApiLogRecord) {
        if let Ok(mut records) = self.records.lock() {
            if records.len() == API_LOG_CAPACITY {
                records.pop_front();
            }
            records.push_back(record);
        }
    }

    pub fn recent(&self) -> Vec<ApiLogRecord> {
        self.records
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Issues single GET calls against the endpoint.
///
/// Decorates each call with a request id and client version, enforces a
/// hard timeout and classifies the outcome into a `RequestError`.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    endpoint: String,
    client_version: String,
    log: Arc<ApiLog>,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        client_version: impl Into<String>,
        log: Arc<ApiLog>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            client_version: client_version.into(),
            log,
        }
    }

    pub async fn execute(
        &self,
        action: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value, RequestError> {
        let request_id = Uuid::new_v4().to_string();
        let mut request = HttpRequest::get(&self.endpoint, timeout);
        request.query.push(("action".to_string(), action.to_string()));
        request.query.extend(params.iter().cloned());
        request.headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Request-ID".to_string(), request_id.clone()),
            ("X-Client-Version".to_string(), self.client_version.clone()),
        ];

        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_) => Err(RequestError::Timeout(timeout)),
            Ok(Err(RequestError::Timeout(_))) => Err(RequestError::Timeout(timeout)),
            Ok(Err(e)) => Err(e),
            Ok(Ok(reply)) if !reply.is_success() => Err(RequestError::HttpStatus(reply.status)),
            Ok(Ok(reply)) => serde_json::from_str::<Value>(&reply.body)
                .map_err(|e| RequestError::MalformedResponse(e.to_string())),
        };
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.to_string(),
        };
        if result.is_ok() {
            info!(
                request_id = %request_id,
                action,
                elapsed_ms = elapsed.as_millis() as u64,
                "api request completed"
            );
        } else {
            warn!(
                request_id = %request_id,
                action,
                elapsed_ms = elapsed.as_millis() as u64,
                outcome = %outcome,
                "api request failed"
            );
        }
        self.log.push(ApiLogRecord {
            request_id,
            action: action.to_string(),
            elapsed_ms: elapsed.as_millis(),
            outcome,
            at: Utc::now(),
        });

        result
    }
}
