use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// Queue priority: High drains first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

// Where a fetched value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Network,
    Cache,
    /// Served from cache while the connectivity signal reports offline
    OfflineCache,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched {
    pub value: Value,
    pub source: DataSource,
}

/// Per-call knobs for `PortfolioApi::fetch_data`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub priority: Priority,
    /// Skip the cache lookup and overwrite the entry on success
    pub force_refresh: bool,
    /// Overrides the configured default TTL
    pub ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

// Uploaded attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

// Contact form as entered, before enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub subject: String,
    pub message: String,
    pub service: String,
    pub budget: String,
    pub timeline: String,
    pub urgency: String,
    pub attachments: Vec<Attachment>,
}

impl ContactForm {
    /// Text fields in wire order, keyed by their wire names.
    pub fn wire_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("company", self.company.as_str()),
            ("subject", self.subject.as_str()),
            ("message", self.message.as_str()),
            ("service_interested", self.service.as_str()),
            ("budget_range", self.budget.as_str()),
            ("timeline", self.timeline.as_str()),
            ("urgency", self.urgency.as_str()),
        ]
    }

    pub fn filled_field_count(&self) -> usize {
        self.wire_fields()
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .count()
    }
}

/// A contact form enriched with client metadata, ready to be encoded.
#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub submission_id: String,
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
    pub ip: String,
    pub user_agent: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// Transport-level request and reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text { name: String, value: String },
    File(FilePart),
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Text { name, .. } => name,
            Part::File(file) => &file.field,
        }
    }
}

/// Multipart form body; parts go on the wire in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    pub parts: Vec<Part>,
}

impl MultipartBody {
    pub fn text(&mut self, name: &str, value: &str) {
        self.parts.push(Part::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn file(&mut self, field: &str, attachment: &Attachment) {
        self.parts.push(Part::File(FilePart {
            field: field.to_string(),
            file_name: attachment.file_name.clone(),
            media_type: attachment.media_type.clone(),
            bytes: attachment.bytes.clone(),
        }));
    }

    /// Value of the first text part called `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            Part::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &FilePart> {
        self.parts.iter().filter_map(|part| match part {
            Part::File(file) => Some(file),
            Part::Text { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<MultipartBody>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: &str, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(url: &str, body: MultipartBody, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            url: url.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
            timeout,
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// One entry of the recent-requests log
#[derive(Debug, Clone, Serialize)]
pub struct ApiLogRecord {
    pub request_id: String,
    pub action: String,
    pub elapsed_ms: u128,
    pub outcome: String,
    pub at: DateTime<Utc>,
}

// UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "en".to_string(),
        }
    }
}
