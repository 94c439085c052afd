//! Result synthesis
//!
//! Renders an `AggregatedResult` into one human-readable narrative:
//! a paragraph per successful outcome through an agent-specific formatter,
//! then a single line naming every agent that timed out or failed. Rendering
//! is deterministic and side-effect free, and never returns an empty string.

use crate::coordinator::{AggregatedResult, AgentOutcome};
use serde_json::Value;

/// Fixed response when no agent produced a payload
pub const TOTAL_FAILURE_MESSAGE: &str =
    "Unable to complete query - all agents failed or timed out.";

/// Renders aggregated agent outcomes into a single narrative
#[derive(Debug, Clone, Default)]
pub struct ResultSynthesizer;

impl ResultSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Render the final response text
    pub fn synthesize(&self, result: &AggregatedResult) -> String {
        let successes: Vec<&AgentOutcome> = result.successes().collect();

        if successes.is_empty() {
            return TOTAL_FAILURE_MESSAGE.to_string();
        }

        let mut parts = Vec::with_capacity(successes.len() + 2);
        parts.push(format!("Analysis of: {}", result.query.text));

        for outcome in &successes {
            if let AgentOutcome::Success { agent, payload, .. } = outcome {
                parts.push(format_agent_payload(agent, payload));
            }
        }

        let failed = result.failed_agents();
        if !failed.is_empty() {
            parts.push(format!(
                "Note: {} agent(s) encountered errors: {}",
                failed.len(),
                failed.join(", ")
            ));
        }

        parts.join("\n\n")
    }
}

/// Format one agent's payload with agent-specific field extraction
///
/// The known remote data agents get a tailored summary; anything else falls
/// back to the payload's own `summary` field or a compact rendering.
fn format_agent_payload(agent: &str, payload: &Value) -> String {
    match agent {
        "fred" => format_fred(payload),
        "bls" => format_bls(payload),
        "treasury" => format_treasury(payload),
        _ => format_generic(agent, payload),
    }
}

fn format_fred(payload: &Value) -> String {
    if let Some(stats) = payload.get("statistics") {
        let latest = field_or_na(stats, "latest");
        let mean = field_or_na(stats, "mean");
        return format!("Actual Outcomes (FRED):\n- Latest: {latest}\n- Mean: {mean}");
    }
    format!("FRED data: {}", compact(payload))
}

fn format_bls(payload: &Value) -> String {
    if payload.get("components").is_some() {
        return "Inflation Components (BLS):\n- Primary drivers identified\n- See detailed breakdown"
            .to_string();
    }
    format!("BLS data: {}", compact(payload))
}

fn format_treasury(payload: &Value) -> String {
    if let Some(characteristics) = payload.get("curve_characteristics") {
        let status = field_or_na(characteristics, "curve_status");
        let signal = field_or_na(characteristics, "recession_signal");
        return format!(
            "Market Signals (Treasury):\n- Curve status: {status}\n- Recession signal: {signal}"
        );
    }
    format!("Treasury data: {}", compact(payload))
}

fn format_generic(agent: &str, payload: &Value) -> String {
    match payload.get("summary").and_then(Value::as_str) {
        Some(summary) => format!("{agent}: {summary}"),
        None => format!("{agent}: {}", compact(payload)),
    }
}

fn field_or_na(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "N/A".to_string(),
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
