// HTTP client utilities
use crate::domain::error::{FolioError, RequestError};
use crate::domain::model::{HttpReply, HttpRequest, Method, MultipartBody, Part as BodyPart};
use crate::domain::traits::Transport;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// Create a default HTTP client with appropriate settings
pub fn create_client(user_agent: &str) -> Result<Client, FolioError> {
    Ok(Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .user_agent(user_agent)
        .build()?)
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn build_form(body: MultipartBody) -> Result<Form, RequestError> {
    let mut form = Form::new();
    for part in body.parts {
        form = match part {
            BodyPart::Text { name, value } => form.text(name, value),
            BodyPart::File(file) => {
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.media_type)
                    .map_err(|e| RequestError::Network(format!("invalid media type: {}", e)))?;
                form.part(file.field, part)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, RequestError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.multipart(build_form(body)?);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout(request.timeout)
            } else {
                RequestError::from(e)
            }
        })?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpReply { status, body })
    }
}
