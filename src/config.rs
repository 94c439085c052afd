//! Configuration surface for the orchestrator
//!
//! All routing and coordination behavior is data-driven: query-type
//! definitions, per-agent keyword lists, per-agent query templates, the
//! clarification threshold, and timeout defaults are supplied as static TOML
//! configuration at process start. There is no runtime mutation API; registry
//! changes require a restart, which keeps routing decisions reproducible for
//! a given configuration version.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Top-level orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub query_types: Vec<QueryTypeConfig>,
}

/// `[orchestrator]` section: thresholds and timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorSection {
    /// Routing confidence below which a clarification prompt is attached
    #[serde(default = "default_clarification_threshold")]
    pub clarification_threshold: f64,
    /// Default per-agent deadline in seconds
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,
    /// Bound on concurrent remote invocations; absent means full fan-out
    pub max_parallel_agents: Option<usize>,
    /// Idle TTL for sessions in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_clarification_threshold() -> f64 {
    0.4
}

fn default_agent_timeout_secs() -> u64 {
    30
}

fn default_session_ttl_secs() -> u64 {
    3600
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            clarification_threshold: default_clarification_threshold(),
            agent_timeout_secs: default_agent_timeout_secs(),
            max_parallel_agents: None,
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

/// Whether an agent is reachable over the network or callable in-process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Remote,
    Local,
}

/// `[[agents]]` entry: one agent's static description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Agent identifier (must match [a-zA-Z0-9._-]+)
    pub name: String,
    pub kind: AgentKind,
    /// Endpoint URL; required for remote agents, ignored for local ones
    pub endpoint: Option<String>,
    #[serde(default)]
    pub primary_keywords: Vec<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    /// Callable surfaces this agent exposes, in declaration order
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
    /// Per-query-type templates for rendering the agent-specific query.
    /// Placeholders are `{param}` names from extracted parameters.
    #[serde(default)]
    pub templates: HashMap<String, String>,
}

/// One callable surface an agent exposes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationConfig {
    pub name: String,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub required_params: Vec<String>,
}

/// `[[query_types]]` entry: one classifiable query pattern
///
/// Declaration order is significant: classification ties and operation
/// selection ties break toward the earlier entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryTypeConfig {
    pub name: String,
    /// Keywords whose presence scores this type
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Example query; word overlap contributes a small additional score
    pub example: Option<String>,
    #[serde(default)]
    pub required_agents: Vec<String>,
    #[serde(default)]
    pub optional_agents: Vec<String>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid agent name: {0}")]
    InvalidAgentName(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate internal consistency
    ///
    /// Catches the configuration bugs that would otherwise surface at runtime
    /// as `UnknownAgent` failures on every query.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.orchestrator.clarification_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "clarification_threshold {threshold} must be within [0, 1]"
            )));
        }

        if let Some(0) = self.orchestrator.max_parallel_agents {
            return Err(ConfigError::InvalidConfig(
                "max_parallel_agents must be >= 1".to_string(),
            ));
        }

        for agent in &self.agents {
            validate_agent_name(&agent.name)?;
            if agent.kind == AgentKind::Remote && agent.endpoint.is_none() {
                return Err(ConfigError::InvalidConfig(format!(
                    "Remote agent '{}' has no endpoint",
                    agent.name
                )));
            }
        }

        // Every agent a query type references must exist
        for query_type in &self.query_types {
            for name in query_type
                .required_agents
                .iter()
                .chain(query_type.optional_agents.iter())
            {
                if !self.agents.iter().any(|a| &a.name == name) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "Query type '{}' references unknown agent '{}'",
                        query_type.name, name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Look up a query type definition by name
    pub fn query_type(&self, name: &str) -> Option<&QueryTypeConfig> {
        self.query_types.iter().find(|q| q.name == name)
    }

    /// Default per-agent deadline as a `Duration`
    pub fn agent_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.orchestrator.agent_timeout_secs)
    }

    /// Small but representative configuration for unit tests
    #[cfg(test)]
    pub fn test_config() -> Self {
        crate::testing::fixtures::sample_config()
    }
}

/// Validate agent name format
fn validate_agent_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentName(format!(
            "Agent name '{name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
