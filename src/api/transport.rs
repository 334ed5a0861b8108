//! HTTP transport seam.
//!
//! Everything that actually touches the network goes through the [`Transport`]
//! trait, so tests can substitute an in-memory implementation and the client
//! logic stays free of retry or auth concerns.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::constants;
use super::schema::HttpMethod;

/// Request body, serialized per API family convention.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    Xml(String),
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Payload>,
    pub timeout: Duration,
    pub verify_tls: bool,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// A sender of single HTTP requests. Implementations must not retry and must
/// not interpret the response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by pooled reqwest clients.
///
/// TLS verification is a client-level setting in reqwest, so one verifying
/// and one non-verifying client are built up front and picked per request.
pub struct HttpTransport {
    verified: reqwest::Client,
    insecure: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            verified: Self::build_client(true),
            insecure: Self::build_client(false),
        }
    }

    fn build_client(verify: bool) -> reqwest::Client {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(constants::USER_AGENT)
            .danger_accept_invalid_certs(!verify)
            .build()
            .expect("failed to build HTTP client")
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let client = if request.verify_tls {
            &self.verified
        } else {
            &self.insecure
        };

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = client.request(method, &request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(Payload::Json(value)) => builder.json(value),
            Some(Payload::Xml(text)) => builder.body(text.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.text().await.map_err(classify_error)?;

        Ok(TransportResponse {
            status,
            body,
            headers,
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(error.to_string())
    }
}
