//! HTTP transport to the receiver's control URL.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;

use crate::error::{ReceiverError, Result};
use crate::protocol::CONTROL_PATH;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends a complete request document and returns the raw response body.
///
/// Implementations never fail: any transport problem is logged and
/// collapsed into an empty string, which callers treat as "no data".
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &str) -> String;
}

/// Where the receiver lives. Fixed for the lifetime of an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    host: String,
    control_url: String,
    timeout: Duration,
}

impl DeviceEndpoint {
    /// `host` may carry a port (`192.168.1.20:8080`).
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ReceiverError::InvalidEndpoint("empty host".to_string()));
        }
        let url = url::Url::parse(&format!("http://{}{}", host, CONTROL_PATH))
            .map_err(|e| ReceiverError::InvalidEndpoint(format!("{}: {}", host, e)))?;
        if url.path() != CONTROL_PATH {
            return Err(ReceiverError::InvalidEndpoint(host.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            control_url: url.to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// reqwest-backed transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: DeviceEndpoint,
    http: Client,
}

impl HttpTransport {
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        let http = build_client(Client::builder().timeout(endpoint.timeout()), &endpoint);
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    async fn post(&self, request: &str) -> Result<String> {
        let transport_err =
            |e: reqwest::Error| ReceiverError::Transport(format!("{}: {}", self.endpoint.host, e));

        let response = self
            .http
            .post(self.endpoint.control_url())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(request.to_string())
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ReceiverError::Transport(format!(
                "{}: HTTP {}",
                self.endpoint.host, status
            )));
        }

        response.text().await.map_err(transport_err)
    }
}

/// Falls back to reqwest's default client, which has no request timeout.
fn build_client(builder: ClientBuilder, endpoint: &DeviceEndpoint) -> Client {
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(
            host = %endpoint.host,
            "HTTP client setup failed ({}), requests will not time out",
            e
        );
        Client::new()
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &str) -> String {
        tracing::debug!(host = %self.endpoint.host, %request, "Receiver request");
        match self.post(request).await {
            Ok(body) => {
                tracing::trace!(host = %self.endpoint.host, response = %body, "Receiver response");
                body
            }
            Err(e) => {
                tracing::warn!("Receiver request failed: {}", e);
                String::new()
            }
        }
    }
}
