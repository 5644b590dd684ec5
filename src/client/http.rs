//! HTTP request sender

use super::{elapsed_ms, RequestSender};
use crate::{
    error::{AppError, Result},
    models::{RequestOutcome, TestConfiguration},
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method};
use std::{error::Error as _, time::Duration, time::Instant};

/// Sends one HTTP request per call through a shared `reqwest` client
pub struct HttpSender {
    client: Client,
}

impl HttpSender {
    /// Create a sender whose client enforces `timeout` on every request
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request(
        &self,
        config: &TestConfiguration,
    ) -> std::result::Result<reqwest::RequestBuilder, String> {
        let method = Method::from_bytes(config.method.trim().to_uppercase().as_bytes())
            .map_err(|e| format!("Invalid HTTP method '{}': {}", config.method, e))?;

        let mut request = self
            .client
            .request(method, config.target.trim())
            .timeout(config.timeout());

        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if config.method_allows_body() {
            if let Some(body) = config.body_bytes() {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_vec());
            }
        }

        Ok(request)
    }
}

#[async_trait]
impl RequestSender for HttpSender {
    async fn send(&self, config: &TestConfiguration) -> RequestOutcome {
        let request = match self.build_request(config) {
            Ok(request) => request,
            Err(message) => return RequestOutcome::failed(message, 0.0),
        };

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return RequestOutcome::timeout(config.timeout(), elapsed_ms(start))
            }
            Err(e) => return RequestOutcome::failed(describe_error(e), elapsed_ms(start)),
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => RequestOutcome::from_http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                elapsed_ms(start),
                body.len() as u64,
            ),
            Err(e) if e.is_timeout() => RequestOutcome::timeout(config.timeout(), elapsed_ms(start)),
            Err(e) => RequestOutcome::failed(
                format!("Failed to read response body: {}", describe_error(e)),
                elapsed_ms(start),
            ),
        }
    }
}

/// Render a transport error with its cause chain and without the URL
fn describe_error(error: reqwest::Error) -> String {
    let error = error.without_url();
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
