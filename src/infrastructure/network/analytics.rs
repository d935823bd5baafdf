// Fire-and-forget analytics beacons sent to the portfolio endpoint
use crate::application::pacing::Throttle;
use crate::domain::error::RequestError;
use crate::domain::model::HttpRequest;
use crate::domain::traits::Transport;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Analytics {
    transport: Arc<dyn Transport>,
    endpoint: String,
    enabled: bool,
    timeout: Duration,
    interactions: Throttle,
}

impl Analytics {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        enabled: bool,
        timeout: Duration,
        interaction_interval: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            enabled,
            timeout,
            interactions: Throttle::new(interaction_interval),
        }
    }

    pub async fn track_page_view(&self, page: &str) {
        self.send("trackPageView", json!({ "page": page })).await;
    }

    /// Throttled per interaction name.
    pub async fn track_interaction(&self, name: &str, data: Value) {
        if !self.interactions.try_acquire(name) {
            debug!(name, "interaction throttled");
            return;
        }
        self.send("trackInteraction", json!({ "name": name, "data": data }))
            .await;
    }

    pub async fn track_conversion(&self, kind: &str, data: Value) {
        self.send("trackConversion", json!({ "type": kind, "data": data }))
            .await;
    }

    pub async fn log_form_interaction(&self, stage: &str, data: Value) {
        self.send("logFormInteraction", json!({ "stage": stage, "data": data }))
            .await;
    }

    async fn send(&self, action: &str, data: Value) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.try_send(action, data).await {
            debug!(action, error = %e, "analytics beacon dropped");
        }
    }

    async fn try_send(&self, action: &str, data: Value) -> Result<(), RequestError> {
        let mut request = HttpRequest::get(&self.endpoint, self.timeout);
        request.query = vec![
            ("action".to_string(), action.to_string()),
            ("data".to_string(), data.to_string()),
        ];
        let reply = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| RequestError::Analytics("timed out".to_string()))?
            .map_err(|e| RequestError::Analytics(e.to_string()))?;
        if !reply.is_success() {
            return Err(RequestError::Analytics(format!("status {}", reply.status)));
        }
        Ok(())
    }
}
