//! Heterogeneous agent invocation
//!
//! Remote (network) and local (in-process) agents sit behind one polymorphic
//! `Invocable` capability. Each implementation turns exactly one
//! `AgentInvocation` into exactly one terminal `AgentOutcome`; errors and
//! deadline expiry are materialized as outcome variants, never raised.

use crate::error::{LocalError, OutcomeErrorKind};
use crate::registry::AgentDescriptor;
use crate::transport::RemoteTransport;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::AgentOutcome;

/// One unit of dispatched work: which agent, which operation, with what
/// arguments, under what deadline
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub agent: String,
    pub operation: String,
    pub arguments: Map<String, Value>,
    pub deadline: Duration,
}

/// A capability the coordinator can invoke without knowing its kind
#[async_trait]
pub trait Invocable: Send + Sync {
    async fn invoke(&self, invocation: &AgentInvocation) -> AgentOutcome;
}

/// Local agent protocol: a named operation taking all inputs from its
/// argument map. No side channels.
#[async_trait]
pub trait LocalOperation: Send + Sync {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, LocalError>;
}

/// Registry of local operations keyed by `(agent, operation)`
///
/// Built once at process start and passed explicitly to the coordinator;
/// local callables are never reached through ambient globals.
#[derive(Default, Clone)]
pub struct LocalOperationTable {
    operations: HashMap<(String, String), Arc<dyn LocalOperation>>,
}

impl LocalOperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A, O>(&mut self, agent: A, operation: O, callable: Arc<dyn LocalOperation>)
    where
        A: Into<String>,
        O: Into<String>,
    {
        self.operations
            .insert((agent.into(), operation.into()), callable);
    }

    pub fn get(&self, agent: &str, operation: &str) -> Option<Arc<dyn LocalOperation>> {
        self.operations
            .get(&(agent.to_string(), operation.to_string()))
            .cloned()
    }
}

impl std::fmt::Debug for LocalOperationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOperationTable")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Remote agent invocation over a transport
///
/// Owns its deadline: expiry yields a `Timeout` outcome and cancels only this
/// call's in-flight request (dropping the transport future), never siblings.
pub struct RemoteInvocable {
    descriptor: AgentDescriptor,
    transport: Arc<dyn RemoteTransport>,
    /// Agent-specific query rendered from the per-agent template
    agent_query: String,
}

impl RemoteInvocable {
    pub fn new(
        descriptor: AgentDescriptor,
        transport: Arc<dyn RemoteTransport>,
        agent_query: String,
    ) -> Self {
        Self {
            descriptor,
            transport,
            agent_query,
        }
    }
}

#[async_trait]
impl Invocable for RemoteInvocable {
    async fn invoke(&self, invocation: &AgentInvocation) -> AgentOutcome {
        let endpoint = match self.descriptor.endpoint.as_deref() {
            Some(endpoint) => endpoint,
            None => {
                // Guarded at config load; kept as an outcome for safety
                return AgentOutcome::Failure {
                    agent: invocation.agent.clone(),
                    kind: OutcomeErrorKind::TransportError,
                    message: format!("Remote agent '{}' has no endpoint", invocation.agent),
                };
            }
        };

        let started = Instant::now();
        let send = self.transport.send(endpoint, &self.agent_query);

        match tokio::time::timeout(invocation.deadline, send).await {
            Ok(Ok(payload)) => {
                debug!(agent = %invocation.agent, "Remote invocation succeeded");
                AgentOutcome::Success {
                    agent: invocation.agent.clone(),
                    operation: invocation.operation.clone(),
                    payload,
                }
            }
            Ok(Err(error)) => {
                warn!(agent = %invocation.agent, %error, "Remote invocation failed");
                AgentOutcome::Failure {
                    agent: invocation.agent.clone(),
                    kind: OutcomeErrorKind::TransportError,
                    message: error.to_string(),
                }
            }
            Err(_) => {
                // Expected operational condition, not logged as an error
                debug!(agent = %invocation.agent, "Remote invocation timed out");
                AgentOutcome::Timeout {
                    agent: invocation.agent.clone(),
                    elapsed: started.elapsed(),
                }
            }
        }
    }
}

/// Local agent invocation through the operation table
pub struct LocalInvocable {
    table: LocalOperationTable,
}

impl LocalInvocable {
    pub fn new(table: LocalOperationTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Invocable for LocalInvocable {
    async fn invoke(&self, invocation: &AgentInvocation) -> AgentOutcome {
        let callable = match self.table.get(&invocation.agent, &invocation.operation) {
            Some(callable) => callable,
            None => {
                return AgentOutcome::Failure {
                    agent: invocation.agent.clone(),
                    kind: OutcomeErrorKind::LocalInvocationError,
                    message: format!(
                        "No local operation registered for '{}::{}'",
                        invocation.agent, invocation.operation
                    ),
                };
            }
        };

        match callable.call(&invocation.arguments).await {
            Ok(payload) => AgentOutcome::Success {
                agent: invocation.agent.clone(),
                operation: invocation.operation.clone(),
                payload,
            },
            Err(error) => {
                warn!(agent = %invocation.agent, operation = %invocation.operation, %error,
                      "Local invocation failed");
                AgentOutcome::Failure {
                    agent: invocation.agent.clone(),
                    kind: OutcomeErrorKind::LocalInvocationError,
                    message: error.to_string(),
                }
            }
        }
    }
}

/// Pick the operation whose trigger keywords best match the query text
///
/// Ties break toward the earlier declaration; zero matches everywhere also
/// degrade to the first declared operation.
pub fn select_operation<'a>(
    descriptor: &'a AgentDescriptor,
    query_lower: &str,
) -> Option<&'a crate::registry::OperationDescriptor> {
    let mut best: Option<(&crate::registry::OperationDescriptor, usize)> = None;

    for operation in &descriptor.operations {
        let hits = operation
            .trigger_keywords
            .iter()
            .filter(|k| query_lower.contains(k.as_str()))
            .count();

        if best.map_or(true, |(_, h)| hits > h) {
            best = Some((operation, hits));
        }
    }

    best.map(|(op, _)| op)
}

/// Render an agent query template, substituting `{param}` placeholders with
/// extracted parameter values
pub fn render_template(template: &str, parameters: &Map<String, Value>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in parameters {
        let placeholder = format!("{{{key}}}");
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, &value_to_text(value));
        }
    }
    rendered
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
