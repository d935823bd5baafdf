use crate::application::api::PortfolioApi;
use crate::application::contact::ContactPipeline;
use crate::application::queue::RequestQueue;
use crate::domain::error::FolioError;
use crate::domain::traits::Transport;
use crate::infrastructure::config::Config;
use crate::infrastructure::network::analytics::Analytics;
use crate::infrastructure::network::connectivity::Connectivity;
use crate::infrastructure::network::executor::{ApiLog, RequestExecutor};
use crate::infrastructure::network::http::{create_client, ReqwestTransport};
use crate::infrastructure::storage::cache::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_rusqlite::Connection;

/// Application context, built once at startup and passed by reference.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Connection>,
    pub config: Arc<Config>,
    pub transport: Arc<dyn Transport>,
    pub cache: Arc<CacheStore>,
    pub connectivity: Connectivity,
    pub queue: Arc<RequestQueue>,
    pub api_log: Arc<ApiLog>,
    pub analytics: Arc<Analytics>,
    pub api: PortfolioApi,
    pub contact: Arc<ContactPipeline>,
}

impl AppState {
    pub fn new(db: Connection, config: Config) -> Result<Self, FolioError> {
        let client = create_client(&config.client_version)?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(client));
        Ok(Self::with_transport(db, config, transport))
    }

    /// Wire every component around `transport`.
    pub fn with_transport(db: Connection, config: Config, transport: Arc<dyn Transport>) -> Self {
        let cache = Arc::new(CacheStore::new(config.cache_ttl()));
        let connectivity = Connectivity::new(true);
        let queue = Arc::new(
            RequestQueue::new(Arc::clone(&cache), connectivity.clone(), config.retry_policy())
                .with_interactive_workers(config.queue.interactive_workers),
        );
        let api_log = Arc::new(ApiLog::default());
        let executor = Arc::new(RequestExecutor::new(
            Arc::clone(&transport),
            config.endpoint.clone(),
            config.client_version.clone(),
            Arc::clone(&api_log),
        ));
        let analytics = Arc::new(Analytics::new(
            Arc::clone(&transport),
            config.endpoint.clone(),
            config.analytics.enable,
            Duration::from_millis(config.analytics.timeout_ms),
            Duration::from_millis(config.analytics.interaction_interval_ms),
        ));
        let api = PortfolioApi::new(
            executor,
            Arc::clone(&cache),
            Arc::clone(&queue),
            connectivity.clone(),
            config.request_timeout(),
        );
        let contact = Arc::new(ContactPipeline::new(
            Arc::clone(&transport),
            Arc::clone(&analytics),
            config.endpoint.clone(),
            user_agent(&config.client_version),
            config.contact.clone(),
            config.ip_lookup.clone(),
        ));

        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            transport,
            cache,
            connectivity,
            queue,
            api_log,
            analytics,
            api,
            contact,
        }
    }
}

fn user_agent(client_version: &str) -> String {
    format!(
        "{} ({}; {})",
        client_version,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
