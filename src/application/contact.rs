use crate::domain::error::RequestError;
use crate::domain::model::{
    ContactForm, ContactSubmission, HttpRequest, MultipartBody, SubmissionResponse,
};
use crate::domain::traits::Transport;
use crate::infrastructure::config::{ContactConfig, IpLookupConfig};
use crate::infrastructure::network::analytics::Analytics;
use crate::infrastructure::network::ip::lookup_client_ip;
use crate::presentation::render::format_file_size;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const USER_AGENT_LIMIT: usize = 500;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check required fields, email shape and attachment limits.
///
/// Runs before any network traffic. The error names every offending field.
pub fn validate(form: &ContactForm, limits: &ContactConfig) -> Result<(), RequestError> {
    let mut fields = Vec::new();
    let mut message = String::new();

    let required = [
        ("name", &form.name),
        ("email", &form.email),
        ("subject", &form.subject),
        ("message", &form.message),
        ("service", &form.service),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            fields.push(name.to_string());
        }
    }

    if !form.email.trim().is_empty() && !is_valid_email(form.email.trim()) {
        fields.push("email".to_string());
        message = "Please enter a valid email address".to_string();
    }

    if !fields.is_empty() {
        if message.is_empty() {
            message = format!("Please fill in all required fields: {}", fields.join(", "));
        }
        return Err(RequestError::Validation { fields, message });
    }

    validate_attachments(form, limits)
}

fn validate_attachments(form: &ContactForm, limits: &ContactConfig) -> Result<(), RequestError> {
    let attachments = &form.attachments;
    if attachments.is_empty() {
        return Ok(());
    }

    if attachments.len() > limits.max_files {
        return Err(RequestError::Validation {
            fields: vec!["attachments".to_string()],
            message: format!("Too many files (max {})", limits.max_files),
        });
    }

    let mut problems = Vec::new();
    for file in attachments {
        let type_allowed = limits.allowed_types.is_empty()
            || limits.allowed_types.iter().any(|t| t == &file.media_type)
            || file
                .extension()
                .map(|ext| limits.allowed_extensions.iter().any(|e| e == &ext))
                .unwrap_or(false);
        if !type_allowed {
            problems.push(format!("• {}: File type not allowed", file.file_name));
        }
        if file.size() > limits.max_file_size {
            problems.push(format!(
                "• {}: File too large (max {})",
                file.file_name,
                format_file_size(limits.max_file_size)
            ));
        }
    }

    let total: u64 = attachments.iter().map(|f| f.size()).sum();
    if total > limits.max_total_size {
        problems.push(format!(
            "• Attachments total {} (max {})",
            format_file_size(total),
            format_file_size(limits.max_total_size)
        ));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(RequestError::Validation {
            fields: vec!["attachments".to_string()],
            message: format!("Invalid files:\n{}", problems.join("\n")),
        })
    }
}

/// Date-time in the backend sheet's `MM/DD/YYYY HH:MM:SS` format.
pub fn format_created_at<Tz: chrono::TimeZone>(at: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%m/%d/%Y %H:%M:%S").to_string()
}

pub fn encode_submission(submission: &ContactSubmission) -> MultipartBody {
    let mut body = MultipartBody::default();
    body.text("action", "submitContact");
    for (name, value) in &submission.fields {
        body.text(name, value);
    }
    for attachment in &submission.attachments {
        body.file("attachments", attachment);
    }
    body.text("ip_address", &submission.ip);
    body.text("user_agent", &submission.user_agent);
    body.text("created_at", &submission.created_at);
    body
}

/// Validates, enriches and posts contact form submissions.
pub struct ContactPipeline {
    transport: Arc<dyn Transport>,
    analytics: Arc<Analytics>,
    endpoint: String,
    user_agent: String,
    limits: ContactConfig,
    ip_lookup: IpLookupConfig,
}

impl ContactPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        analytics: Arc<Analytics>,
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
        limits: ContactConfig,
        ip_lookup: IpLookupConfig,
    ) -> Self {
        Self {
            transport,
            analytics,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
            limits,
            ip_lookup,
        }
    }

    pub async fn submit(&self, form: ContactForm) -> Result<SubmissionResponse, RequestError> {
        validate(&form, &self.limits)?;

        let submission_id = Uuid::new_v4().to_string();
        let filled = form.filled_field_count();
        let attachments = form.attachments.len();
        info!(submission_id = %submission_id, filled, attachments, "contact submission started");
        self.analytics
            .log_form_interaction(
                "started",
                json!({ "submissionId": submission_id, "filledFields": filled, "attachments": attachments }),
            )
            .await;

        let result = self.post(&submission_id, form).await;

        match &result {
            Ok(_) => {
                info!(submission_id = %submission_id, attachments, "contact submission succeeded");
                self.analytics
                    .log_form_interaction(
                        "success",
                        json!({ "submissionId": submission_id, "attachments": attachments }),
                    )
                    .await;
                self.analytics
                    .track_conversion(
                        "contact_form",
                        json!({ "submissionId": submission_id, "attachments": attachments }),
                    )
                    .await;
            }
            Err(e) => {
                warn!(submission_id = %submission_id, error = %e, "contact submission failed");
                self.analytics
                    .log_form_interaction(
                        "failed",
                        json!({ "submissionId": submission_id, "error": e.to_string() }),
                    )
                    .await;
            }
        }

        result
    }

    async fn post(
        &self,
        submission_id: &str,
        form: ContactForm,
    ) -> Result<SubmissionResponse, RequestError> {
        let ip = lookup_client_ip(
            self.transport.as_ref(),
            &self.ip_lookup.services,
            Duration::from_millis(self.ip_lookup.timeout_ms),
        )
        .await;

        let submission = ContactSubmission {
            submission_id: submission_id.to_string(),
            fields: form
                .wire_fields()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.trim().to_string()))
                .collect(),
            attachments: form.attachments,
            ip,
            user_agent: self.user_agent.chars().take(USER_AGENT_LIMIT).collect(),
            created_at: format_created_at(&chrono::Local::now()),
        };

        let timeout = Duration::from_millis(self.limits.timeout_ms);
        let request = HttpRequest::post(&self.endpoint, encode_submission(&submission), timeout);
        let reply = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| RequestError::Timeout(timeout))??;

        if !reply.is_success() {
            return Err(RequestError::HttpStatus(reply.status));
        }

        let response: SubmissionResponse = serde_json::from_str(&reply.body)
            .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;
        if !response.success {
            let reason = response
                .error
                .clone()
                .or_else(|| response.message.clone())
                .unwrap_or_else(|| "Submission failed".to_string());
            return Err(RequestError::Rejected(reason));
        }

        Ok(response)
    }
}
