//! Query routing
//!
//! Classifies a free-text query into a query type, scores every registered
//! agent's relevance, and produces a `RoutingDecision` naming the agents to
//! dispatch plus any parameters extracted from the text. Routing is a pure
//! function of the query text and static configuration: the same text always
//! yields the same decision.

pub mod params;
pub mod router;

pub use router::{QueryRouter, QueryType, RoutingDecision, DEFAULT_QUERY_TYPE};

use serde::{Deserialize, Serialize};

/// One caller request, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub text: String,
    pub session_id: Option<String>,
}

impl Query {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            session_id: None,
        }
    }

    pub fn with_session<S: Into<String>, I: Into<String>>(text: S, session_id: I) -> Self {
        Self {
            text: text.into(),
            session_id: Some(session_id.into()),
        }
    }
}
