use crate::application::queue::{Backoff, RetryPolicy, DEFAULT_INTERACTIVE_WORKERS};
use crate::domain::error::FolioError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,
    pub database_path: Option<String>,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub ip_lookup: IpLookupConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_enable")]
    pub persist: bool,
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
    /// Immediate first attempts allowed at once
    #[serde(default = "default_interactive_workers")]
    pub interactive_workers: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContactConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_total_size")]
    pub max_total_size: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_submit_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IpLookupConfig {
    #[serde(default = "default_ip_services")]
    pub services: Vec<String>,
    #[serde(default = "default_ip_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyticsConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_interaction_interval_ms")]
    pub interaction_interval_ms: u64,
    #[serde(default = "default_analytics_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectivityConfig {
    /// 0 disables the reachability probe
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: default_log_level(),
        }
    }
}

impl Logging {
    /// `tracing_subscriber` filter directive for the configured level.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "INFO" => "info",
            "ERROR" => "error",
            _ => "warn",
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            persist: true,
            persist_debounce_ms: default_persist_debounce_ms(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff: Backoff::default(),
            interactive_workers: default_interactive_workers(),
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_total_size: default_max_total_size(),
            max_files: default_max_files(),
            allowed_types: default_allowed_types(),
            allowed_extensions: default_allowed_extensions(),
            timeout_ms: default_submit_timeout_ms(),
        }
    }
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            services: default_ip_services(),
            timeout_ms: default_ip_timeout_ms(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            interaction_interval_ms: default_interaction_interval_ms(),
            timeout_ms: default_analytics_timeout_ms(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_version: default_client_version(),
            theme: default_theme(),
            sections: default_sections(),
            database_path: None,
            request: RequestConfig::default(),
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
            contact: ContactConfig::default(),
            ip_lookup: IpLookupConfig::default(),
            analytics: AnalyticsConfig::default(),
            connectivity: ConnectivityConfig::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.queue.max_attempts.max(1),
            base_delay: Duration::from_millis(self.queue.base_delay_ms),
            max_delay: Duration::from_millis(self.queue.max_delay_ms),
            backoff: self.queue.backoff,
        }
    }
}

// Defaults
fn default_endpoint() -> String {
    "https://script.google.com/macros/s/AKfycbyLOEQ-RO7xEvcfwxdQ4rbjAh9CEmyHFbyA1jmnSocYo1vksJP44uklxSc3GZ0GqUNm5Q/exec"
        .to_string()
}
fn default_client_version() -> String {
    format!("folio/{}", env!("CARGO_PKG_VERSION"))
}
fn default_theme() -> String {
    "light".to_string()
}
fn default_sections() -> Vec<String> {
    ["getProfile", "getProjects", "getSkills", "getExperience"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_persist_debounce_ms() -> u64 {
    2_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_interactive_workers() -> usize {
    DEFAULT_INTERACTIVE_WORKERS
}
fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}
fn default_max_total_size() -> u64 {
    25 * 1024 * 1024
}
fn default_max_files() -> usize {
    5
}
fn default_allowed_types() -> Vec<String> {
    [
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "text/csv",
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_allowed_extensions() -> Vec<String> {
    [
        "pdf", "doc", "docx", "xls", "xlsx", "csv", "jpg", "jpeg", "png", "gif", "webp", "txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_submit_timeout_ms() -> u64 {
    30_000
}
fn default_ip_services() -> Vec<String> {
    vec![
        "https://api.ipify.org?format=json".to_string(),
        "https://ifconfig.me/ip".to_string(),
    ]
}
fn default_ip_timeout_ms() -> u64 {
    3_000
}
fn default_interaction_interval_ms() -> u64 {
    1_000
}
fn default_analytics_timeout_ms() -> u64 {
    5_000
}
fn default_probe_interval_secs() -> u64 {
    15
}
fn default_probe_timeout_ms() -> u64 {
    3_000
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "WARN".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("folio").join("config.toml"))
}

/// Get database path (config override, else the config directory)
pub fn get_database_path(config: &Config) -> PathBuf {
    if let Some(path) = config.database_path.as_deref() {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    // ~/.config/folio/folio.db (Linux)
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
        .join("folio.db")
}

pub fn parse_config(content: &str) -> Result<Config, FolioError> {
    Ok(toml::from_str::<Config>(content)?)
}

pub fn load_config() -> Result<Config, FolioError> {
    let config_path = get_config_path();

    if let Some(path) = config_path {
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            match parse_config(&content) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse config file: {}. Using defaults.",
                        e
                    );
                }
            }
        }
    }

    Ok(Config::default())
}

pub fn generate_config_sample() -> Result<(), FolioError> {
    let config_path = get_config_path();

    if let Some(path) = config_path {
        if path.exists() {
            eprintln!("Config file already exists at: {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let sample = Config::default();
        let toml_content = toml::to_string_pretty(&sample)
            .map_err(|e| FolioError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, toml_content)
            .map_err(|e| FolioError::Config(format!("Failed to write config file: {}", e)))?;
        println!("Generated config file at: {}", path.display());
    } else {
        return Err(FolioError::Config(
            "Cannot determine config directory".to_string(),
        ));
    }

    Ok(())
}
