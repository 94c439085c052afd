//! Static agent registry
//!
//! A read-only lookup table of every agent the orchestrator can dispatch to,
//! built once from configuration at process start. No mutation API is exposed
//! at runtime, so a given configuration version always produces the same
//! routing decisions.

use crate::config::{AgentKind, ConfigError, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One callable surface an agent exposes
///
/// The coordinator uses `trigger_keywords` to pick which operation on a
/// selected agent to invoke, and `required_params` to decide which extracted
/// or session-carried parameters must be passed along.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationDescriptor {
    pub name: String,
    pub trigger_keywords: Vec<String>,
    pub required_params: Vec<String>,
}

/// Static description of one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDescriptor {
    pub name: String,
    pub kind: AgentKind,
    /// Endpoint URL for remote agents; `None` for local ones
    pub endpoint: Option<String>,
    /// Keywords weighted 0.3 per match during routing
    pub primary_keywords: Vec<String>,
    /// Keywords weighted 0.1 per match during routing
    pub secondary_keywords: Vec<String>,
    /// Operations in declaration order; order breaks selection ties
    pub operations: Vec<OperationDescriptor>,
    /// Query templates keyed by query-type name
    pub templates: HashMap<String, String>,
}

impl AgentDescriptor {
    pub fn is_remote(&self) -> bool {
        self.kind == AgentKind::Remote
    }

    /// Template for a query type, if one is configured
    pub fn template_for(&self, query_type: &str) -> Option<&str> {
        self.templates.get(query_type).map(String::as_str)
    }
}

/// Immutable registry of agent descriptors
///
/// Descriptors keep configuration declaration order; `all()` iterates in that
/// order, which makes agent scoring deterministic.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
    by_name: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Build the registry from validated configuration
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, ConfigError> {
        let mut agents = Vec::with_capacity(config.agents.len());
        let mut by_name = HashMap::with_capacity(config.agents.len());

        for agent in &config.agents {
            if by_name.contains_key(&agent.name) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Duplicate agent name '{}'",
                    agent.name
                )));
            }

            let descriptor = AgentDescriptor {
                name: agent.name.clone(),
                kind: agent.kind,
                endpoint: agent.endpoint.clone(),
                primary_keywords: agent.primary_keywords.clone(),
                secondary_keywords: agent.secondary_keywords.clone(),
                operations: agent
                    .operations
                    .iter()
                    .map(|op| OperationDescriptor {
                        name: op.name.clone(),
                        trigger_keywords: op.trigger_keywords.clone(),
                        required_params: op.required_params.clone(),
                    })
                    .collect(),
                templates: agent.templates.clone(),
            };

            debug!(agent = %descriptor.name, kind = ?descriptor.kind, "Registered agent");
            by_name.insert(descriptor.name.clone(), agents.len());
            agents.push(descriptor);
        }

        info!("Agent registry built with {} agents", agents.len());
        Ok(Self { agents, by_name })
    }

    /// Look up an agent descriptor by name
    pub fn describe(&self, name: &str) -> Option<&AgentDescriptor> {
        self.by_name.get(name).map(|&i| &self.agents[i])
    }

    /// All descriptors in configuration order
    pub fn all(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
