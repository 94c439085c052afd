//! Mock implementations for testing
//!
//! Provides a scripted `RemoteTransport` and canned `LocalOperation`s so the
//! router/coordinator/orchestrator stack can be tested without any network
//! or real agent content.

use crate::coordinator::LocalOperation;
use crate::error::{LocalError, TransportError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::transport::RemoteTransport;

/// Scripted remote transport
///
/// Responds per endpoint (falling back to a default payload), and can be told
/// to fail, hang forever, or delay specific endpoints. Records every query it
/// is asked to send.
#[derive(Debug, Default)]
pub struct MockTransport {
    default_payload: Option<Value>,
    responses: HashMap<String, Value>,
    failing: HashSet<String>,
    fail_all: bool,
    hanging: HashSet<String>,
    delay: Option<Duration>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload returned for endpoints without a scripted response
    pub fn respond_with_default(mut self, payload: Value) -> Self {
        self.default_payload = Some(payload);
        self
    }

    /// Payload returned for one specific endpoint
    pub fn respond_with<S: Into<String>>(mut self, endpoint: S, payload: Value) -> Self {
        self.responses.insert(endpoint.into(), payload);
        self
    }

    /// Make one endpoint fail with a transport error
    pub fn failing<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.failing.insert(endpoint.into());
        self
    }

    /// Make every endpoint fail with a transport error
    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Make one endpoint never respond (for timeout tests)
    pub fn hanging<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.hanging.insert(endpoint.into());
        self
    }

    /// Delay every response by a fixed duration
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `(endpoint, agent_query)` pair sent so far
    pub async fn sent_queries(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn send(&self, endpoint: &str, agent_query: &str) -> Result<Value, TransportError> {
        self.sent
            .lock()
            .await
            .push((endpoint.to_string(), agent_query.to_string()));

        if self.hanging.contains(endpoint) {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves");
        }

        if self.fail_all || self.failing.contains(endpoint) {
            return Err(TransportError::Status {
                status: 500,
                body: "mock transport failure".to_string(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .get(endpoint)
            .or(self.default_payload.as_ref())
            .cloned()
            .ok_or_else(|| {
                TransportError::InvalidResponse(format!("No scripted payload for {endpoint}"))
            })
    }
}

/// Local operation returning a fixed payload
pub struct StaticOperation {
    payload: Value,
}

impl StaticOperation {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl LocalOperation for StaticOperation {
    async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, LocalError> {
        Ok(self.payload.clone())
    }
}

/// Local operation that always fails
pub struct FailingOperation {
    message: String,
}

impl FailingOperation {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LocalOperation for FailingOperation {
    async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, LocalError> {
        Err(LocalError::execution_failed(self.message.clone()))
    }
}

/// Local operation echoing its arguments back as the payload
pub struct EchoOperation;

#[async_trait]
impl LocalOperation for EchoOperation {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, LocalError> {
        Ok(Value::Object(arguments.clone()))
    }
}
