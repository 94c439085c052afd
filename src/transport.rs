//! Remote agent transport
//!
//! The coordinator talks to remote agents only through the `RemoteTransport`
//! trait: given an endpoint and a natural-language agent query, return an
//! opaque JSON payload or fail. Deadlines are enforced by the caller; a
//! transport may additionally abort its own in-flight request. Retries, if
//! wanted, belong to the transport implementation, never to the coordinator.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Transport contract for reaching remote agents
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Send a natural-language query to an agent endpoint and return its
    /// payload. The payload schema is implementer-defined and opaque to the
    /// orchestration core.
    async fn send(&self, endpoint: &str, agent_query: &str) -> Result<Value, TransportError>;
}

/// HTTP transport posting `{"query": ...}` as JSON
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn send(&self, endpoint: &str, agent_query: &str) -> Result<Value, TransportError> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidResponse(format!("Invalid endpoint URL: {e}")))?;

        debug!(%url, "Sending remote agent query");

        let response = self
            .client
            .post(url)
            .json(&json!({ "query": agent_query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response.json::<Value>().await?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_endpoint_is_transport_error() {
        let transport = HttpTransport::new();
        let err = transport.send("not a url", "query").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }
}
