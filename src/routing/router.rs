//! Query classification and agent selection
//!
//! The router scores each configured query type against the lower-cased query
//! text, scores every registered agent's relevance from its keyword lists,
//! and combines both into a `RoutingDecision`. Low-confidence decisions carry
//! an advisory clarification prompt rather than failing.

use crate::config::OrchestratorConfig;
use crate::registry::AgentRegistry;
use crate::routing::{params, Query};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Query type the router falls back to when nothing matches
pub const DEFAULT_QUERY_TYPE: &str = "comprehensive_analysis";

/// Weight of a primary keyword match in an agent's relevance score
const PRIMARY_KEYWORD_WEIGHT: f64 = 0.3;
/// Weight of a secondary keyword match in an agent's relevance score
const SECONDARY_KEYWORD_WEIGHT: f64 = 0.1;
/// Agent score at which an unselected agent is promoted to optional
const PROMOTION_THRESHOLD: f64 = 0.5;

/// Classified query type
///
/// Query types are configuration-defined names rather than a closed enum so
/// new types can be added without code changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryType(pub String);

impl QueryType {
    pub fn comprehensive() -> Self {
        Self(DEFAULT_QUERY_TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing decision for one query, never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub query_type: QueryType,
    /// Agents the query type mandates, in configuration order
    pub required_agents: Vec<String>,
    /// Type-configured optional agents plus high-scoring promotions
    pub optional_agents: Vec<String>,
    /// Relevance score per registered agent, clamped to [0, 1]
    pub per_agent_score: HashMap<String, f64>,
    /// Overall routing confidence in [0, 1]
    pub confidence: f64,
    /// Structured values pulled from the query text
    pub extracted_parameters: Map<String, Value>,
    /// Human-readable explanation of the decision
    pub reasoning: String,
    /// Advisory prompt attached when confidence is below the threshold
    pub clarification: Option<String>,
}

impl RoutingDecision {
    /// Required then optional agents, deduplicated, in dispatch order
    pub fn selected_agents(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for name in self.required_agents.iter().chain(self.optional_agents.iter()) {
            if !seen.contains(&name.as_str()) {
                seen.push(name.as_str());
            }
        }
        seen
    }

    /// True when the decision selects no agents ("no work to dispatch")
    pub fn is_empty(&self) -> bool {
        self.required_agents.is_empty() && self.optional_agents.is_empty()
    }

    pub fn needs_clarification(&self) -> bool {
        self.clarification.is_some()
    }
}

/// Deterministic, rule-based query router
#[derive(Debug, Clone)]
pub struct QueryRouter {
    config: Arc<OrchestratorConfig>,
    registry: Arc<AgentRegistry>,
}

impl QueryRouter {
    pub fn new(config: Arc<OrchestratorConfig>, registry: Arc<AgentRegistry>) -> Self {
        Self { config, registry }
    }

    /// Analyze a query and decide which agents to dispatch to
    ///
    /// Scoring ignores the session: routing is a pure function of the query
    /// text and static configuration. Carried-over session parameters are
    /// applied later, by the coordinator, when building invocation arguments.
    pub fn route(&self, query: &Query, _session: Option<&Session>) -> RoutingDecision {
        let lower = query.text.to_lowercase();

        let (query_type, type_confidence) = self.classify(&lower);
        let per_agent_score = self.score_agents(&lower);
        let (required_agents, optional_agents) = self.select_agents(&query_type, &per_agent_score);

        let mean_agent_score = if per_agent_score.is_empty() {
            0.0
        } else {
            per_agent_score.values().sum::<f64>() / per_agent_score.len() as f64
        };
        let confidence = (0.6 * type_confidence + 0.4 * mean_agent_score).clamp(0.0, 1.0);

        let extracted_parameters = params::extract_parameters(&query.text);
        let reasoning = self.build_reasoning(&query_type, &required_agents, &per_agent_score);

        let clarification = if confidence < self.config.orchestrator.clarification_threshold {
            Some(clarification_prompt())
        } else {
            None
        };

        info!(
            query_type = %query_type,
            confidence,
            required = required_agents.len(),
            optional = optional_agents.len(),
            "Routed query"
        );

        RoutingDecision {
            query_type,
            required_agents,
            optional_agents,
            per_agent_score,
            confidence,
            extracted_parameters,
            reasoning,
            clarification,
        }
    }

    /// Score each configured query type; highest wins, ties break toward the
    /// earlier configuration entry. Nothing above zero falls back to the most
    /// general type with confidence 0.5.
    fn classify(&self, lower: &str) -> (QueryType, f64) {
        let query_words: Vec<&str> = lower.split_whitespace().collect();

        let mut best: Option<(&str, f64)> = None;
        for query_type in &self.config.query_types {
            let mut score = 0.0;

            if query_type.keywords.iter().any(|k| lower.contains(k)) {
                score += 0.5;
            }

            if let Some(example) = &query_type.example {
                let example_lower = example.to_lowercase();
                let overlap = example_lower
                    .split_whitespace()
                    .filter(|w| query_words.contains(w))
                    .count();
                score += overlap as f64 * 0.1;
            }

            debug!(query_type = %query_type.name, score, "Scored query type");

            // Strict comparison keeps the earlier entry on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((&query_type.name, score));
            }
        }

        match best {
            Some((name, score)) if score > 0.0 => {
                (QueryType(name.to_string()), score.min(1.0))
            }
            _ => (QueryType::comprehensive(), 0.5),
        }
    }

    /// Relevance score for every registered agent
    fn score_agents(&self, lower: &str) -> HashMap<String, f64> {
        let mut scores = HashMap::with_capacity(self.registry.len());

        for agent in self.registry.all() {
            let primary_hits = agent
                .primary_keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .count();
            let secondary_hits = agent
                .secondary_keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .count();

            let score = (primary_hits as f64 * PRIMARY_KEYWORD_WEIGHT
                + secondary_hits as f64 * SECONDARY_KEYWORD_WEIGHT)
                .min(1.0);
            scores.insert(agent.name.clone(), score);
        }

        scores
    }

    /// Required set from the query type's configuration; optional set is the
    /// configured list extended with high-scoring agents not already present.
    fn select_agents(
        &self,
        query_type: &QueryType,
        scores: &HashMap<String, f64>,
    ) -> (Vec<String>, Vec<String>) {
        let type_config = self.config.query_type(query_type.as_str());

        let required: Vec<String> = type_config
            .map(|c| c.required_agents.clone())
            .unwrap_or_default();
        let mut optional: Vec<String> = type_config
            .map(|c| c.optional_agents.clone())
            .unwrap_or_default();

        // Promote high scorers; iterate the registry for deterministic order
        for agent in self.registry.all() {
            let score = scores.get(&agent.name).copied().unwrap_or(0.0);
            if score >= PROMOTION_THRESHOLD
                && !required.contains(&agent.name)
                && !optional.contains(&agent.name)
            {
                optional.push(agent.name.clone());
            }
        }

        (required, optional)
    }

    fn build_reasoning(
        &self,
        query_type: &QueryType,
        required: &[String],
        scores: &HashMap<String, f64>,
    ) -> String {
        let mut reasoning = format!("Query classified as '{query_type}'. ");

        if !required.is_empty() {
            reasoning.push_str(&format!(
                "Using {} required agent(s): {}. ",
                required.len(),
                required.join(", ")
            ));
        }

        let mut high_scorers: Vec<&str> = scores
            .iter()
            .filter(|(_, &s)| s >= PROMOTION_THRESHOLD)
            .map(|(name, _)| name.as_str())
            .collect();
        high_scorers.sort_unstable();
        if !high_scorers.is_empty() {
            reasoning.push_str(&format!("High relevance: {}.", high_scorers.join(", ")));
        }

        reasoning
    }
}

fn clarification_prompt() -> String {
    "I'm not entirely sure how to help with that. Could you clarify if you want:\n\
     1. Analysis of a specific FOMC meeting?\n\
     2. The current policy stance?\n\
     3. A historical comparison to past episodes?\n\
     4. Long-term trend analysis?\n\
     5. A comprehensive report?"
        .to_string()
}
