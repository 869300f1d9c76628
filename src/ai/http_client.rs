//! HTTP transport
//!
//! The provider adapters only produce and consume bytes; this module moves
//! them over the wire. One pooled reqwest client is built per provider so
//! connections (and TLS sessions) are reused across all calls to it.
//!
//! `Transport` is the seam the client talks to, which keeps the retry and
//! concurrency logic testable without a network.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::config::ProviderConfig;
use super::error::AiError;

/// Connect timeout; the per-call timeout comes from `ProviderConfig`
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully-built provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireRequest {
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw provider response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text for diagnostics
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends wire requests; implementations must be safe to share across tasks
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, AiError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a pooled client tuned for one provider
    ///
    /// - total timeout from `ProviderConfig::timeout_secs`
    /// - idle pool sized to the provider's concurrency ceiling
    pub fn new(config: &ProviderConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(config.effective_concurrency())
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| AiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, AiError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| AiError::InvalidRequest(format!("bad method {}: {}", request.method, e)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Transport(format!("Request timed out: {}", e))
            } else {
                AiError::Transport(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AiError::Transport(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}
