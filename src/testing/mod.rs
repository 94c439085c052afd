//! Test support utilities
//!
//! Mock transports and local operations plus configuration fixtures, shared
//! by unit tests and the integration suite.

pub mod mocks;

pub mod fixtures {
    use crate::config::OrchestratorConfig;

    /// Small but representative configuration: two remote agents (fred, bls),
    /// one local agent with two operations, and three query types.
    pub fn sample_config() -> OrchestratorConfig {
        let toml_content = r#"
[orchestrator]
clarification_threshold = 0.4
agent_timeout_secs = 5

[[agents]]
name = "fred"
kind = "remote"
endpoint = "http://localhost:8001/query"
primary_keywords = ["inflation", "unemployment", "gdp", "fed funds", "pce"]
secondary_keywords = ["growth", "employment", "interest rate"]

[agents.templates]
inflation_analysis = "Get inflation data for {dates}"

[[agents]]
name = "bls"
kind = "remote"
endpoint = "http://localhost:8002/query"
primary_keywords = ["cpi", "ppi", "wages", "labor", "inflation"]
secondary_keywords = ["jobs", "price index", "shelter"]

[[agents]]
name = "policy_analyzer"
kind = "local"
primary_keywords = ["stance", "hawkish", "dovish", "regime"]
secondary_keywords = ["recent", "lately"]

[[agents.operations]]
name = "classify_stance"
trigger_keywords = ["stance", "hawkish", "dovish"]
required_params = ["dates"]

[[agents.operations]]
name = "detect_regime"
trigger_keywords = ["regime", "shift"]

[[query_types]]
name = "inflation_analysis"
keywords = ["inflation", "cpi", "prices", "driving"]
example = "What's driving current inflation?"
required_agents = ["fred", "bls"]
optional_agents = ["policy_analyzer"]

[[query_types]]
name = "current_stance"
keywords = ["current", "now", "stance", "policy"]
example = "What is the current policy stance?"
required_agents = ["policy_analyzer"]
optional_agents = ["fred"]

[[query_types]]
name = "comprehensive_analysis"
keywords = ["comprehensive", "complete", "full analysis"]
required_agents = ["policy_analyzer"]
optional_agents = ["fred", "bls"]
"#;
        toml::from_str(toml_content).expect("Sample config should parse")
    }
}
