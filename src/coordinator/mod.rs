//! Multi-agent coordination
//!
//! Executes a `RoutingDecision`: remote invocations fan out concurrently
//! through a bounded pool with per-call deadlines, local invocations run
//! sequentially on the calling task, and every dispatched invocation yields
//! exactly one outcome. The coordinator waits for all scheduled work before
//! returning; one agent's failure or timeout never suppresses another
//! agent's outcome.

pub mod invocation;

pub use invocation::{
    AgentInvocation, Invocable, LocalInvocable, LocalOperation, LocalOperationTable,
    RemoteInvocable,
};

use crate::config::AgentKind;
use crate::error::{CoordinatorError, OutcomeErrorKind};
use crate::registry::AgentRegistry;
use crate::routing::{Query, RoutingDecision};
use crate::session::Session;
use crate::transport::RemoteTransport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Terminal result of one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Success {
        agent: String,
        operation: String,
        /// Opaque payload handed unmodified to the synthesizer
        payload: Value,
    },
    Timeout {
        agent: String,
        elapsed: Duration,
    },
    Failure {
        agent: String,
        kind: OutcomeErrorKind,
        message: String,
    },
}

impl AgentOutcome {
    pub fn agent(&self) -> &str {
        match self {
            AgentOutcome::Success { agent, .. }
            | AgentOutcome::Timeout { agent, .. }
            | AgentOutcome::Failure { agent, .. } => agent,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success { .. })
    }
}

/// All outcomes of one coordination batch, in dispatch order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedResult {
    pub query: Query,
    pub outcomes: Vec<AgentOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AggregatedResult {
    /// Successful outcomes in dispatch order
    pub fn successes(&self) -> impl Iterator<Item = &AgentOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Names of agents that timed out or failed, in dispatch order
    pub fn failed_agents(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.agent())
            .collect()
    }

    /// Names of agents that contributed a successful payload
    pub fn agents_used(&self) -> Vec<String> {
        self.successes().map(|o| o.agent().to_string()).collect()
    }
}

/// Planned work for one selected agent
enum PlannedDispatch {
    /// Agent missing from the registry; resolves immediately to a failure
    Unknown { agent: String },
    Local { invocation: AgentInvocation },
    Remote {
        descriptor: crate::registry::AgentDescriptor,
        invocation: AgentInvocation,
        agent_query: String,
    },
}

/// Dispatches routing decisions to agents and aggregates their outcomes
pub struct AgentCoordinator {
    registry: Arc<AgentRegistry>,
    transport: Arc<dyn RemoteTransport>,
    local_operations: LocalOperationTable,
    /// Bound on concurrent remote invocations; `None` means full fan-out
    max_parallel: Option<usize>,
}

impl AgentCoordinator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn RemoteTransport>,
        local_operations: LocalOperationTable,
        max_parallel: Option<usize>,
    ) -> Self {
        Self {
            registry,
            transport,
            local_operations,
            max_parallel,
        }
    }

    /// Execute a routing decision and collect one outcome per invocation
    ///
    /// Returns an error only for faults in the coordination machinery itself;
    /// agent-level problems are always captured as outcomes.
    pub async fn coordinate(
        &self,
        query: &Query,
        decision: &RoutingDecision,
        session: Option<&Session>,
        per_agent_timeout: Duration,
    ) -> Result<AggregatedResult, CoordinatorError> {
        if !(0.0..=1.0).contains(&decision.confidence) {
            return Err(CoordinatorError::MalformedDecision(format!(
                "confidence {} out of range",
                decision.confidence
            )));
        }

        let started_at = Utc::now();
        let plan = self.build_plan(query, decision, session, per_agent_timeout);

        info!(
            agents = plan.len(),
            query_type = %decision.query_type,
            "Coordinating agents"
        );

        let mut slots: Vec<Option<AgentOutcome>> = (0..plan.len()).map(|_| None).collect();

        // Remote fan-out starts first so local work overlaps network waits
        let remote_count = plan
            .iter()
            .filter(|p| matches!(p, PlannedDispatch::Remote { .. }))
            .count();
        let permits = self.max_parallel.unwrap_or(remote_count).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut join_set: JoinSet<(usize, AgentOutcome)> = JoinSet::new();

        let mut local_batch: Vec<(usize, AgentInvocation)> = Vec::new();

        for (index, planned) in plan.into_iter().enumerate() {
            match planned {
                PlannedDispatch::Unknown { agent } => {
                    warn!(%agent, "Routing decision references unknown agent");
                    slots[index] = Some(AgentOutcome::Failure {
                        agent: agent.clone(),
                        kind: OutcomeErrorKind::UnknownAgent,
                        message: format!("Agent '{agent}' is not in the registry"),
                    });
                }
                PlannedDispatch::Local { invocation } => {
                    local_batch.push((index, invocation));
                }
                PlannedDispatch::Remote {
                    descriptor,
                    invocation,
                    agent_query,
                } => {
                    let invocable =
                        RemoteInvocable::new(descriptor, Arc::clone(&self.transport), agent_query);
                    let semaphore = Arc::clone(&semaphore);

                    join_set.spawn(async move {
                        let outcome = match semaphore.acquire().await {
                            Ok(_permit) => invocable.invoke(&invocation).await,
                            // The semaphore outlives every spawned task;
                            // kept as an outcome for safety
                            Err(_) => AgentOutcome::Failure {
                                agent: invocation.agent.clone(),
                                kind: OutcomeErrorKind::TransportError,
                                message: "coordination pool closed".to_string(),
                            },
                        };
                        (index, outcome)
                    });
                }
            }
        }

        // Local invocations run sequentially on this task; they are assumed
        // cheap and order-sensitive with respect to shared session context
        let local_invocable = LocalInvocable::new(self.local_operations.clone());
        for (index, invocation) in local_batch {
            debug!(agent = %invocation.agent, operation = %invocation.operation,
                   "Invoking local agent");
            slots[index] = Some(local_invocable.invoke(&invocation).await);
        }

        // Wait for every spawned invocation; none are orphaned or dropped
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(join_error) => {
                    return Err(CoordinatorError::TaskPanicked(join_error.to_string()));
                }
            }
        }

        let outcomes: Vec<AgentOutcome> = slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    CoordinatorError::MalformedDecision(
                        "invocation produced no outcome".to_string(),
                    )
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(AggregatedResult {
            query: query.clone(),
            outcomes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Build one planned dispatch per selected agent, in dispatch order
    fn build_plan(
        &self,
        query: &Query,
        decision: &RoutingDecision,
        session: Option<&Session>,
        per_agent_timeout: Duration,
    ) -> Vec<PlannedDispatch> {
        let query_lower = query.text.to_lowercase();
        let mut plan = Vec::new();

        for agent_name in decision.selected_agents() {
            let descriptor = match self.registry.describe(agent_name) {
                Some(descriptor) => descriptor,
                None => {
                    plan.push(PlannedDispatch::Unknown {
                        agent: agent_name.to_string(),
                    });
                    continue;
                }
            };

            let operation = invocation::select_operation(descriptor, &query_lower);
            let operation_name = operation
                .map(|op| op.name.clone())
                .unwrap_or_else(|| "query".to_string());

            let mut arguments = decision.extracted_parameters.clone();
            if let Some(operation) = operation {
                // Session context fills required params the query didn't carry
                for param in &operation.required_params {
                    if !arguments.contains_key(param) {
                        if let Some(value) = session.and_then(|s| s.context.get(param)) {
                            arguments.insert(param.clone(), value.clone());
                        }
                    }
                }
            }

            let invocation = AgentInvocation {
                agent: descriptor.name.clone(),
                operation: operation_name,
                arguments,
                deadline: per_agent_timeout,
            };

            match descriptor.kind {
                AgentKind::Local => plan.push(PlannedDispatch::Local { invocation }),
                AgentKind::Remote => {
                    let agent_query = descriptor
                        .template_for(decision.query_type.as_str())
                        .map(|t| {
                            invocation::render_template(t, &decision.extracted_parameters)
                        })
                        .unwrap_or_else(|| query.text.clone());
                    plan.push(PlannedDispatch::Remote {
                        descriptor: descriptor.clone(),
                        invocation,
                        agent_query,
                    });
                }
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::routing::{QueryRouter, QueryType};
    use crate::testing::mocks::{FailingOperation, MockTransport, StaticOperation};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Instant;

    fn registry() -> Arc<AgentRegistry> {
        let config = OrchestratorConfig::test_config();
        Arc::new(AgentRegistry::from_config(&config).unwrap())
    }

    fn decision_for(text: &str) -> (Query, RoutingDecision) {
        let config = Arc::new(OrchestratorConfig::test_config());
        let registry = Arc::new(AgentRegistry::from_config(&config).unwrap());
        let router = QueryRouter::new(config, registry);
        let query = Query::new(text);
        let decision = router.route(&query, None);
        (query, decision)
    }

    fn local_table() -> LocalOperationTable {
        let mut table = LocalOperationTable::new();
        table.register(
            "policy_analyzer",
            "classify_stance",
            Arc::new(StaticOperation::new(json!({"stance": "hawkish"}))),
        );
        table.register(
            "policy_analyzer",
            "detect_regime",
            Arc::new(StaticOperation::new(json!({"regime_change": false}))),
        );
        table
    }

    #[tokio::test]
    async fn test_one_outcome_per_invocation() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let (query, decision) = decision_for("What's driving current inflation and cpi?");
        let expected = decision.selected_agents().len();

        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(result.outcomes.len(), expected);
    }

    #[tokio::test]
    async fn test_outcomes_preserve_dispatch_order() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let (query, decision) = decision_for("What's driving current inflation and cpi?");
        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        let dispatch_order: Vec<&str> = decision.selected_agents();
        let outcome_order: Vec<&str> = result.outcomes.iter().map(|o| o.agent()).collect();
        assert_eq!(outcome_order, dispatch_order);
    }

    #[tokio::test]
    async fn test_unknown_agent_recorded_not_fatal() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let (query, mut decision) = decision_for("What's driving current inflation and cpi?");
        decision.required_agents.push("ghost".to_string());

        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        let ghost = result
            .outcomes
            .iter()
            .find(|o| o.agent() == "ghost")
            .unwrap();
        assert!(matches!(
            ghost,
            AgentOutcome::Failure {
                kind: OutcomeErrorKind::UnknownAgent,
                ..
            }
        ));
        // Other agents still produced outcomes
        assert!(result.outcomes.iter().any(|o| o.agent() == "fred" && o.is_success()));
    }

    #[tokio::test]
    async fn test_timeout_isolated_from_sibling_success() {
        let transport = Arc::new(
            MockTransport::new()
                .respond_with_default(json!({"ok": true}))
                .hanging("http://localhost:8001/query"),
        );
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let (query, decision) = decision_for("What's driving current inflation and cpi?");

        let started = Instant::now();
        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_millis(100))
            .await
            .unwrap();
        let elapsed = started.elapsed();

        let fred = result.outcomes.iter().find(|o| o.agent() == "fred").unwrap();
        assert!(matches!(fred, AgentOutcome::Timeout { .. }));

        let bls = result.outcomes.iter().find(|o| o.agent() == "bls").unwrap();
        assert!(bls.is_success());

        // The batch is bounded by the deadline, not the hung call
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_local_error_becomes_failure_outcome() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
        let mut table = LocalOperationTable::new();
        table.register(
            "policy_analyzer",
            "classify_stance",
            Arc::new(FailingOperation::new("corpus unavailable")),
        );
        let coordinator = AgentCoordinator::new(registry(), transport, table, None);

        let (query, decision) = decision_for("What is the current policy stance?");
        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        let analyzer = result
            .outcomes
            .iter()
            .find(|o| o.agent() == "policy_analyzer")
            .unwrap();
        assert!(matches!(
            analyzer,
            AgentOutcome::Failure {
                kind: OutcomeErrorKind::LocalInvocationError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_failure_outcome() {
        let transport = Arc::new(
            MockTransport::new()
                .respond_with_default(json!({"ok": true}))
                .failing("http://localhost:8002/query"),
        );
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let (query, decision) = decision_for("What's driving current inflation and cpi?");
        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        let bls = result.outcomes.iter().find(|o| o.agent() == "bls").unwrap();
        assert!(matches!(
            bls,
            AgentOutcome::Failure {
                kind: OutcomeErrorKind::TransportError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_decision_is_no_work() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let query = Query::new("anything");
        let decision = RoutingDecision {
            query_type: QueryType::comprehensive(),
            required_agents: vec![],
            optional_agents: vec![],
            per_agent_score: HashMap::new(),
            confidence: 0.5,
            extracted_parameters: serde_json::Map::new(),
            reasoning: String::new(),
            clarification: None,
        };

        let result = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_decision_is_machinery_error() {
        let transport = Arc::new(MockTransport::new());
        let coordinator = AgentCoordinator::new(registry(), transport, local_table(), None);

        let query = Query::new("anything");
        let decision = RoutingDecision {
            query_type: QueryType::comprehensive(),
            required_agents: vec![],
            optional_agents: vec![],
            per_agent_score: HashMap::new(),
            confidence: 7.0,
            extracted_parameters: serde_json::Map::new(),
            reasoning: String::new(),
            clarification: None,
        };

        let err = coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::MalformedDecision(_)));
    }

    #[tokio::test]
    async fn test_template_rendered_for_remote_agent() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
        let coordinator =
            AgentCoordinator::new(registry(), Arc::clone(&transport) as _, local_table(), None);

        let (query, decision) =
            decision_for("What's driving inflation and cpi from 2022-01-01 to 2022-12-31?");
        assert_eq!(decision.query_type.as_str(), "inflation_analysis");

        coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(1))
            .await
            .unwrap();

        let sent = transport.sent_queries().await;
        let fred_query = sent
            .iter()
            .find(|(endpoint, _)| endpoint.contains("8001"))
            .map(|(_, q)| q.clone())
            .unwrap();
        assert_eq!(fred_query, "Get inflation data for 2022-01-01, 2022-12-31");

        // No template for bls under this query type: original text passes through
        let bls_query = sent
            .iter()
            .find(|(endpoint, _)| endpoint.contains("8002"))
            .map(|(_, q)| q.clone())
            .unwrap();
        assert_eq!(bls_query, query.text);
    }

    #[tokio::test]
    async fn test_session_context_fills_missing_required_param() {
        let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));

        // Echo back arguments so the test can observe them
        let mut table = LocalOperationTable::new();
        table.register(
            "policy_analyzer",
            "classify_stance",
            Arc::new(crate::testing::mocks::EchoOperation),
        );
        let coordinator = AgentCoordinator::new(registry(), transport, table, None);

        let mut session = Session::new("s1".to_string());
        session
            .context
            .insert("dates".to_string(), json!(["2024-11-07"]));

        // No date in the text; classify_stance requires one
        let (query, decision) = decision_for("What is the current policy stance?");
        let result = coordinator
            .coordinate(&query, &decision, Some(&session), Duration::from_secs(1))
            .await
            .unwrap();

        let analyzer = result
            .outcomes
            .iter()
            .find(|o| o.agent() == "policy_analyzer")
            .unwrap();
        match analyzer {
            AgentOutcome::Success { payload, .. } => {
                assert_eq!(payload["dates"][0], "2024-11-07");
            }
            other => panic!("Expected success, got {other:?}"),
        }
    }
}
