//! End-to-end orchestrator tests
//!
//! Exercises the full process() pipeline (route, coordinate, synthesize,
//! record) through the public API with mocked transports, including the
//! multi-turn session behavior callers depend on.

use fedwatch::config::OrchestratorConfig;
use fedwatch::coordinator::LocalOperationTable;
use fedwatch::orchestrator::{Orchestrator, ProcessStatus};
use fedwatch::registry::AgentRegistry;
use fedwatch::synthesis::TOTAL_FAILURE_MESSAGE;
use fedwatch::testing::fixtures::sample_config;
use fedwatch::testing::mocks::{EchoOperation, MockTransport, StaticOperation};
use serde_json::json;
use std::sync::Arc;

fn build_orchestrator(
    transport: Arc<MockTransport>,
    local_operations: LocalOperationTable,
) -> Orchestrator {
    let config = Arc::new(sample_config());
    let registry = Arc::new(AgentRegistry::from_config(&config).unwrap());
    Orchestrator::new(config, registry, transport, local_operations)
}

fn stance_operations() -> LocalOperationTable {
    let mut table = LocalOperationTable::new();
    table.register(
        "policy_analyzer",
        "classify_stance",
        Arc::new(StaticOperation::new(json!({"summary": "Stance is hawkish"}))),
    );
    table.register(
        "policy_analyzer",
        "detect_regime",
        Arc::new(StaticOperation::new(json!({"summary": "No regime change"}))),
    );
    table
}

#[tokio::test]
async fn test_generated_session_ids_use_conv_prefix() {
    let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
    let orchestrator = build_orchestrator(transport, stance_operations());

    let outcome = orchestrator.process("What's driving inflation?", None).await;

    assert!(outcome.session_id.starts_with("conv-"));
    assert!(orchestrator
        .sessions()
        .get_session(&outcome.session_id)
        .await
        .is_some());
}

#[tokio::test]
async fn test_response_contains_per_agent_sections() {
    let transport = Arc::new(
        MockTransport::new()
            .respond_with(
                "http://localhost:8001/query",
                json!({"statistics": {"latest": 3.2, "mean": 4.1}}),
            )
            .respond_with("http://localhost:8002/query", json!({"components": {}})),
    );
    let orchestrator = build_orchestrator(transport, stance_operations());

    let outcome = orchestrator
        .process("What's driving current inflation and cpi?", None)
        .await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert!(outcome.response_text.contains("Actual Outcomes (FRED)"));
    assert!(outcome.response_text.contains("Inflation Components (BLS)"));
}

#[tokio::test]
async fn test_all_agents_failing_yields_fixed_message() {
    // Remotes fail at the transport level and no local operations exist
    let transport = Arc::new(MockTransport::new().failing_all());
    let orchestrator = build_orchestrator(transport, LocalOperationTable::new());

    let outcome = orchestrator
        .process("What's driving current inflation and cpi?", None)
        .await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert_eq!(outcome.response_text, TOTAL_FAILURE_MESSAGE);
    assert!(outcome.agents_used.is_empty());
}

#[tokio::test]
async fn test_second_turn_reuses_context_from_first() {
    let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));

    // Echo the arguments so the carried-over date is observable
    let mut table = LocalOperationTable::new();
    table.register("policy_analyzer", "classify_stance", Arc::new(EchoOperation));
    table.register("policy_analyzer", "detect_regime", Arc::new(EchoOperation));
    let orchestrator = build_orchestrator(transport, table);

    // First turn carries a date into the session context
    let first = orchestrator
        .process("Inflation from 2024-11-07", Some("conv-ctx"))
        .await;
    assert_eq!(first.status, ProcessStatus::Success);

    // Second turn omits the date; classify_stance requires one and pulls it
    // from session context
    let second = orchestrator
        .process("What is the current policy stance?", Some("conv-ctx"))
        .await;
    assert_eq!(second.status, ProcessStatus::Success);

    let raw = second.raw.unwrap();
    let analyzer = raw
        .outcomes
        .iter()
        .find(|o| o.agent() == "policy_analyzer")
        .unwrap();
    match analyzer {
        fedwatch::coordinator::AgentOutcome::Success { payload, .. } => {
            let dates = payload["dates"].as_array().unwrap();
            assert_eq!(dates[0], "2024-11-07");
        }
        other => panic!("Expected success, got {other:?}"),
    }

    let session = orchestrator
        .sessions()
        .get_session("conv-ctx")
        .await
        .unwrap();
    assert_eq!(session.turns.len(), 2);
}

#[tokio::test]
async fn test_agents_used_reflects_only_successes() {
    let transport = Arc::new(
        MockTransport::new()
            .respond_with("http://localhost:8001/query", json!({"ok": true}))
            .failing("http://localhost:8002/query"),
    );
    let orchestrator = build_orchestrator(transport, stance_operations());

    let outcome = orchestrator
        .process("What's driving current inflation and cpi?", None)
        .await;

    assert!(outcome.agents_used.contains(&"fred".to_string()));
    assert!(!outcome.agents_used.contains(&"bls".to_string()));
    assert!(outcome.response_text.contains("encountered errors"));
}

#[tokio::test]
async fn test_concurrent_queries_on_distinct_sessions() {
    let transport = Arc::new(MockTransport::new().respond_with_default(json!({"ok": true})));
    let orchestrator = Arc::new(build_orchestrator(transport, stance_operations()));

    let outcomes = futures::future::join_all((0..4).map(|i| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            let session_id = format!("conv-{i}");
            orchestrator
                .process("What's driving inflation?", Some(session_id.as_str()))
                .await
        }
    }))
    .await;

    for outcome in outcomes {
        assert_eq!(outcome.status, ProcessStatus::Success);
    }
    assert_eq!(orchestrator.sessions().len(), 4);
}
