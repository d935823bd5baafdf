// Online/offline signal shared by the API client and the retry queue
use crate::domain::model::HttpRequest;
use crate::domain::traits::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                info!("connectivity restored");
            } else {
                warn!("connectivity lost, requests will be queued");
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Periodically check that the endpoint is reachable and update `connectivity`.
///
/// Any HTTP reply counts as online; connection errors and timeouts as offline.
pub async fn run_probe(
    transport: Arc<dyn Transport>,
    connectivity: Connectivity,
    endpoint: String,
    interval: Duration,
    timeout: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let mut request = HttpRequest::get(&endpoint, timeout);
        request.query.push(("action".to_string(), "ping".to_string()));
        let reachable = matches!(
            tokio::time::timeout(timeout, transport.send(request)).await,
            Ok(Ok(_))
        );
        connectivity.set_online(reachable);
    }
}
