//! Coordination integration tests
//!
//! Runs the coordinator against a real HTTP server (wiremock) through the
//! production `HttpTransport`, verifying the wire contract and the
//! failure-isolation guarantees end to end.

use fedwatch::config::OrchestratorConfig;
use fedwatch::coordinator::{AgentCoordinator, AgentOutcome, LocalOperationTable};
use fedwatch::registry::AgentRegistry;
use fedwatch::routing::{Query, QueryRouter};
use fedwatch::transport::{HttpTransport, RemoteTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_with_endpoint(endpoint: &str) -> OrchestratorConfig {
    let toml_content = format!(
        r#"
[orchestrator]
agent_timeout_secs = 2

[[agents]]
name = "fred"
kind = "remote"
endpoint = "{endpoint}"
primary_keywords = ["inflation", "gdp"]

[[query_types]]
name = "inflation_analysis"
keywords = ["inflation"]
required_agents = ["fred"]
"#
    );
    toml::from_str(&toml_content).unwrap()
}

async fn coordinate_against(server: &MockServer) -> Vec<AgentOutcome> {
    let config = Arc::new(config_with_endpoint(&format!("{}/query", server.uri())));
    let registry = Arc::new(AgentRegistry::from_config(&config).unwrap());
    let router = QueryRouter::new(Arc::clone(&config), Arc::clone(&registry));
    let coordinator = AgentCoordinator::new(
        registry,
        Arc::new(HttpTransport::new()),
        LocalOperationTable::new(),
        None,
    );

    let query = Query::new("What's driving inflation?");
    let decision = router.route(&query, None);

    let result = tokio_test::assert_ok!(
        coordinator
            .coordinate(&query, &decision, None, Duration::from_secs(2))
            .await
    );
    result.outcomes
}

#[tokio::test]
async fn test_http_transport_posts_query_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"query": "What's driving inflation?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statistics": {"latest": 3.2}})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new();
    let payload = transport
        .send(&format!("{}/query", server.uri()), "What's driving inflation?")
        .await
        .unwrap();

    assert_eq!(payload["statistics"]["latest"], 3.2);
}

#[tokio::test]
async fn test_http_error_status_surfaces_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new();
    let err = transport
        .send(&format!("{}/query", server.uri()), "anything")
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("503"));
    assert!(message.contains("overloaded"));
}

#[tokio::test]
async fn test_coordinator_success_through_real_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statistics": {"latest": 3.2}})))
        .mount(&server)
        .await;

    let outcomes = coordinate_against(&server).await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        AgentOutcome::Success { agent, payload, .. } => {
            assert_eq!(agent, "fred");
            assert_eq!(payload["statistics"]["latest"], 3.2);
        }
        other => panic!("Expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_coordinator_server_error_becomes_failure_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcomes = coordinate_against(&server).await;

    assert!(matches!(outcomes[0], AgentOutcome::Failure { .. }));
}

#[tokio::test]
async fn test_coordinator_slow_server_becomes_timeout_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let config = Arc::new(config_with_endpoint(&format!("{}/query", server.uri())));
    let registry = Arc::new(AgentRegistry::from_config(&config).unwrap());
    let router = QueryRouter::new(Arc::clone(&config), Arc::clone(&registry));
    let coordinator = AgentCoordinator::new(
        registry,
        Arc::new(HttpTransport::new()),
        LocalOperationTable::new(),
        None,
    );

    let query = Query::new("What's driving inflation?");
    let decision = router.route(&query, None);

    let result = coordinator
        .coordinate(&query, &decision, None, Duration::from_millis(200))
        .await
        .unwrap();

    match &result.outcomes[0] {
        AgentOutcome::Timeout { agent, elapsed } => {
            assert_eq!(agent, "fred");
            assert!(*elapsed >= Duration::from_millis(200));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_becomes_failure_outcome() {
    // Port 1 is never listening
    let config = Arc::new(config_with_endpoint("http://127.0.0.1:1/query"));
    let registry = Arc::new(AgentRegistry::from_config(&config).unwrap());
    let router = QueryRouter::new(Arc::clone(&config), Arc::clone(&registry));
    let coordinator = AgentCoordinator::new(
        registry,
        Arc::new(HttpTransport::new()),
        LocalOperationTable::new(),
        None,
    );

    let query = Query::new("What's driving inflation?");
    let decision = router.route(&query, None);

    let result = coordinator
        .coordinate(&query, &decision, None, Duration::from_secs(2))
        .await
        .unwrap();

    assert!(matches!(result.outcomes[0], AgentOutcome::Failure { .. }));
}
