//! Conversation session store
//!
//! Keeps per-conversation context (prior parameters, prior agent outputs)
//! keyed by a session identifier. Turns are append-only: once recorded they
//! are never edited or removed except by whole-session eviction. Overlapping
//! queries on the same session serialize through a per-session mutex; turns
//! on different sessions proceed independently.

use crate::coordinator::AggregatedResult;
use crate::routing::{Query, RoutingDecision};
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// One completed query turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub query: Query,
    pub decision: RoutingDecision,
    pub result: AggregatedResult,
    pub recorded_at: DateTime<Utc>,
}

/// Per-conversation state, owned exclusively by the `SessionStore`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
    /// Carried-over parameters available as invocation argument fallbacks
    pub context: Map<String, Value>,
    last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            turns: Vec::new(),
            context: Map::new(),
            last_active: now,
        }
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    fn idle_longer_than(&self, ttl: Duration) -> bool {
        let idle = Utc::now().signed_duration_since(self.last_active);
        idle.num_milliseconds() > ttl.as_millis() as i64
    }
}

/// Store of live sessions with explicit create/update/evict lifecycle
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a session, or return the existing one for an explicit id
    ///
    /// Idempotent on explicit ids: re-creating is a no-op, not an error.
    pub fn create(&self, id: Option<String>) -> String {
        let id = id.unwrap_or_else(|| format!("conv-{}", Uuid::new_v4()));

        let mut sessions = self.sessions.write().unwrap();
        if !sessions.contains_key(&id) {
            info!(session = %id, "Created session");
            sessions.insert(id.clone(), Arc::new(Mutex::new(Session::new(id.clone()))));
        }

        id
    }

    fn handle(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    /// Record a completed turn; the only way turns are ever added
    pub async fn append_turn(
        &self,
        id: &str,
        query: Query,
        decision: RoutingDecision,
        result: AggregatedResult,
    ) -> Result<(), SessionError> {
        let handle = self
            .handle(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let mut session = handle.lock().await;
        session.turns.push(Turn {
            query,
            decision,
            result,
            recorded_at: Utc::now(),
        });
        session.touch();
        debug!(session = %id, turns = session.turns.len(), "Appended turn");
        Ok(())
    }

    /// Snapshot of a session's context map; empty for unknown sessions
    pub async fn get_context(&self, id: &str) -> Map<String, Value> {
        match self.handle(id) {
            Some(handle) => handle.lock().await.context.clone(),
            None => Map::new(),
        }
    }

    pub async fn set_context(
        &self,
        id: &str,
        key: String,
        value: Value,
    ) -> Result<(), SessionError> {
        let handle = self
            .handle(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let mut session = handle.lock().await;
        session.context.insert(key, value);
        session.touch();
        Ok(())
    }

    /// Cloned snapshot of a full session
    pub async fn get_session(&self, id: &str) -> Option<Session> {
        match self.handle(id) {
            Some(handle) => Some(handle.lock().await.clone()),
            None => None,
        }
    }

    /// Remove a session and all its turns
    pub fn evict(&self, id: &str) {
        let removed = self.sessions.write().unwrap().remove(id).is_some();
        if removed {
            info!(session = %id, "Evicted session");
        }
    }

    /// Sweep sessions idle longer than the TTL; returns how many were evicted
    pub async fn evict_idle(&self) -> usize {
        let handles: Vec<(String, Arc<Mutex<Session>>)> = {
            let sessions = self.sessions.read().unwrap();
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
                .collect()
        };

        let mut expired = Vec::new();
        for (id, handle) in handles {
            if handle.lock().await.idle_longer_than(self.ttl) {
                expired.push(id);
            }
        }

        let count = expired.len();
        if count > 0 {
            let mut sessions = self.sessions.write().unwrap();
            for id in &expired {
                sessions.remove(id);
            }
            info!(evicted = count, "Evicted idle sessions");
        }

        count
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}
