//! Fedwatch - deterministic query routing and multi-agent coordination
//!
//! A coordination layer that answers natural-language queries about economic
//! data by fanning them out to specialized agents and synthesizing their
//! results into one narrative response.
//!
//! # Overview
//!
//! This crate provides the complete orchestration pipeline:
//! - Keyword-based query classification and agent selection
//! - Concurrent remote dispatch with per-agent deadlines
//! - In-process local operations behind the same invocation seam
//! - Deterministic result synthesis with per-agent formatters
//! - Conversation sessions carrying extracted parameters across turns
//!
//! # Quick Start
//!
//! ```rust
//! use fedwatch::config::OrchestratorConfig;
//! use fedwatch::registry::AgentRegistry;
//!
//! let toml_content = r#"
//! [orchestrator]
//! clarification_threshold = 0.4
//!
//! [[agents]]
//! name = "fred"
//! kind = "remote"
//! endpoint = "http://localhost:8001/query"
//! primary_keywords = ["inflation", "gdp"]
//!
//! [[query_types]]
//! name = "inflation_analysis"
//! keywords = ["inflation", "cpi"]
//! required_agents = ["fred"]
//! "#;
//!
//! let config: OrchestratorConfig = toml::from_str(toml_content).unwrap();
//! config.validate().unwrap();
//!
//! let registry = AgentRegistry::from_config(&config).unwrap();
//! assert!(registry.contains("fred"));
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod registry;
pub mod routing;
pub mod session;
pub mod synthesis;
pub mod testing;
pub mod transport;

pub use config::OrchestratorConfig;
pub use coordinator::{
    AgentCoordinator, AgentOutcome, AggregatedResult, Invocable, LocalOperation,
    LocalOperationTable,
};
pub use error::{OrchestratorError, OrchestratorResult, OutcomeErrorKind};
pub use orchestrator::{Orchestrator, ProcessOutcome, ProcessStatus};
pub use registry::AgentRegistry;
pub use routing::{Query, QueryRouter, QueryType, RoutingDecision};
pub use session::SessionStore;
pub use synthesis::ResultSynthesizer;
pub use transport::{HttpTransport, RemoteTransport};
