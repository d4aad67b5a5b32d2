//! Turn processing: routes a session's input through the agent loop.

use crate::agent::{Agent, TurnReport};
use crate::providers::Provider;
use crate::session::SessionStore;
use tracing::{Instrument, debug, info_span};

/// Snapshot of the assistant's state, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantStats {
    pub session_count: usize,
    pub tool_count: usize,
    pub tool_names: Vec<String>,
}

/// Owns the agent and the session store.
///
/// All methods take `&self`; wrap in an `Arc` to serve turns from
/// several tasks at once.
pub struct Assistant<P> {
    agent: Agent<P>,
    sessions: SessionStore,
}

impl<P: Provider> Assistant<P> {
    pub fn new(agent: Agent<P>, sessions: SessionStore) -> Self {
        Self { agent, sessions }
    }

    /// Process one user input for `session_id` and return the reply.
    pub async fn process(&self, session_id: &str, input: &str) -> String {
        self.process_detailed(session_id, input).await.text
    }

    /// Like [`process`](Self::process), but returns the full turn report.
    pub async fn process_detailed(&self, session_id: &str, input: &str) -> TurnReport {
        let handle = self.sessions.get_or_create(session_id);
        let span = info_span!("turn", session = %session_id);
        async move {
            let mut history = handle.lock().await;
            let report = self.agent.run_turn(&mut history, input).await;
            debug!(
                rounds = report.rounds,
                tool_calls = report.tool_calls,
                history = history.len(),
                "turn finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    pub fn stats(&self) -> AssistantStats {
        let registry = self.agent.registry().stats();
        AssistantStats {
            session_count: self.sessions.count(),
            tool_count: registry.total_tools,
            tool_names: registry.tool_names,
        }
    }

    /// Drop all sessions.
    pub fn shutdown(&self) {
        self.sessions.clear_all();
    }
}
