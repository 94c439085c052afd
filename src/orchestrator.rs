//! Inbound query interface
//!
//! `Orchestrator::process` is the single function-call boundary callers use:
//! it ensures a session exists, routes the query, coordinates the selected
//! agents, synthesizes the final text, and records the turn. Agent-level
//! failures surface only as prose notes in the response; `Error` status is
//! reserved for faults in the coordination machinery itself.

use crate::config::OrchestratorConfig;
use crate::coordinator::{AgentCoordinator, AggregatedResult, LocalOperationTable};
use crate::error::OrchestratorError;
use crate::registry::AgentRegistry;
use crate::routing::{Query, QueryRouter};
use crate::session::SessionStore;
use crate::synthesis::ResultSynthesizer;
use crate::transport::RemoteTransport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Success,
    Error,
}

/// Result of one `process` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub status: ProcessStatus,
    pub response_text: String,
    /// Session the turn was recorded under
    pub session_id: String,
    /// Agents that contributed a successful payload
    pub agents_used: Vec<String>,
    /// Raw aggregation for callers that want per-agent detail
    pub raw: Option<AggregatedResult>,
}

/// Ties the router, coordinator, synthesizer, and session store together
///
/// All collaborators are constructed once at process start and passed in
/// explicitly; there are no ambient globals.
pub struct Orchestrator {
    router: QueryRouter,
    coordinator: AgentCoordinator,
    synthesizer: ResultSynthesizer,
    sessions: SessionStore,
    per_agent_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        config: Arc<OrchestratorConfig>,
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn RemoteTransport>,
        local_operations: LocalOperationTable,
    ) -> Self {
        let per_agent_timeout = config.agent_timeout();
        let sessions = SessionStore::new(Duration::from_secs(
            config.orchestrator.session_ttl_secs,
        ));
        let router = QueryRouter::new(Arc::clone(&config), Arc::clone(&registry));
        let coordinator = AgentCoordinator::new(
            registry,
            transport,
            local_operations,
            config.orchestrator.max_parallel_agents,
        );

        Self {
            router,
            coordinator,
            synthesizer: ResultSynthesizer::new(),
            sessions,
            per_agent_timeout,
        }
    }

    /// Session store accessor for callers managing conversation lifecycle
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer one query, recording the turn in its session
    pub async fn process(&self, text: &str, session_id: Option<&str>) -> ProcessOutcome {
        let session_id = self.sessions.create(session_id.map(String::from));

        match self.process_inner(text, &session_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(%error, session = %session_id, "Query processing failed");
                ProcessOutcome {
                    status: ProcessStatus::Error,
                    response_text: format!("Query processing failed: {error}"),
                    session_id,
                    agents_used: Vec::new(),
                    raw: None,
                }
            }
        }
    }

    async fn process_inner(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<ProcessOutcome, OrchestratorError> {
        let query = Query::with_session(text, session_id);
        let session = self.sessions.get_session(session_id).await;

        let decision = self.router.route(&query, session.as_ref());

        let result = self
            .coordinator
            .coordinate(&query, &decision, session.as_ref(), self.per_agent_timeout)
            .await?;

        let response_text = if result.outcomes.is_empty() {
            // Nothing to dispatch; a clarification prompt, when present, is
            // more useful than the total-failure message
            decision
                .clarification
                .clone()
                .unwrap_or_else(|| self.synthesizer.synthesize(&result))
        } else {
            self.synthesizer.synthesize(&result)
        };

        let agents_used = result.agents_used();

        // Carry extracted parameters forward for later turns
        for (key, value) in &decision.extracted_parameters {
            self.sessions
                .set_context(session_id, key.clone(), value.clone())
                .await?;
        }

        self.sessions
            .append_turn(session_id, query, decision, result.clone())
            .await?;

        info!(
            session = %session_id,
            agents = agents_used.len(),
            "Processed query"
        );

        Ok(ProcessOutcome {
            status: ProcessStatus::Success,
            response_text,
            session_id: session_id.to_string(),
            agents_used,
            raw: Some(result),
        })
    }
}
