//! Error taxonomy for the orchestration core
//!
//! Agent-level problems (unknown agent, timeout, local failure, transport
//! failure) are never raised to callers of `coordinate` or `process`; they are
//! materialized as `AgentOutcome` values. The error types here cover the
//! coordination machinery itself plus the collaborator boundaries.

use thiserror::Error;

/// Error kind recorded on a `Failure` outcome
///
/// `Timeout` is deliberately not a kind here: a remote call exceeding its
/// deadline is an expected operational condition with its own outcome variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeErrorKind {
    /// Routing referenced an agent absent from the registry (configuration bug)
    UnknownAgent,
    /// A local operation returned an error
    LocalInvocationError,
    /// A remote call failed before or without timing out
    TransportError,
}

impl std::fmt::Display for OutcomeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutcomeErrorKind::UnknownAgent => "unknown_agent",
            OutcomeErrorKind::LocalInvocationError => "local_invocation_error",
            OutcomeErrorKind::TransportError => "transport_error",
        };
        f.write_str(s)
    }
}

/// Remote transport failures (network or protocol, not deadline expiry)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from agent: {0}")]
    InvalidResponse(String),
}

/// Local operation failures
#[derive(Debug, Error)]
pub enum LocalError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Operation failed: {0}")]
    ExecutionFailed(String),
}

impl LocalError {
    /// Create an execution failure from any displayable cause
    pub fn execution_failed<S: Into<String>>(message: S) -> Self {
        Self::ExecutionFailed(message.into())
    }
}

/// Faults in the coordination machinery itself
///
/// The only errors `coordinate` ever returns; never produced by an agent.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Malformed routing decision: {0}")]
    MalformedDecision(String),

    #[error("Invocation task panicked: {0}")]
    TaskPanicked(String),
}

/// Session store faults
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Top-level error for `Orchestrator::process` machinery
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Coordination error: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
