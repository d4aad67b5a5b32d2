//! The reason/act loop that drives one turn to a final answer.

use crate::llm::{AssistantOutcome, Message, ToolCallRequest};
use crate::providers::Provider;
use crate::tools::{ToolError, ToolRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default cap on model ↔ tool round trips per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Reply used when a turn exceeds its round-trip cap.
pub const ITERATION_LIMIT_REPLY: &str = "抱歉，我遇到了一些问题，请再试一次。";

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final answer.
    Completed,
    /// The round-trip cap was hit; the reply is the fixed apology.
    IterationLimit,
}

/// Result of running one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub text: String,
    pub outcome: TurnOutcome,
    /// Number of tool round trips executed.
    pub rounds: usize,
    /// Number of individual tool calls dispatched.
    pub tool_calls: usize,
}

/// Drives the model/tool loop over a conversation history.
pub struct Agent<P> {
    provider: P,
    registry: ToolRegistry,
    system_prompt: Option<String>,
    max_iterations: usize,
}

impl<P: Provider> Agent<P> {
    pub fn new(provider: P, registry: ToolRegistry) -> Self {
        Self {
            provider,
            registry,
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the system prompt sent ahead of every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Append `input` to `history` and run until the model answers.
    ///
    /// Every message of the turn (assistant tool requests, tool results,
    /// final answer) is appended to `history`. Never fails: provider and
    /// tool errors are fed back into the conversation, and hitting the
    /// iteration cap yields [`ITERATION_LIMIT_REPLY`].
    pub async fn run_turn(&self, history: &mut Vec<Message>, input: &str) -> TurnReport {
        history.push(Message::user(input));

        let mut rounds = 0;
        let mut dispatched = 0;

        loop {
            let request = self.build_messages(history);
            let outcome = self
                .provider
                .generate(&request, self.registry.specs())
                .await;

            let (text, calls) = match outcome {
                AssistantOutcome::Final(text) => {
                    debug!(rounds, "turn completed");
                    history.push(Message::assistant(text.clone()));
                    return TurnReport {
                        text,
                        outcome: TurnOutcome::Completed,
                        rounds,
                        tool_calls: dispatched,
                    };
                }
                AssistantOutcome::ToolCalls { text, calls } => (text, calls),
            };

            if rounds >= self.max_iterations {
                warn!(
                    rounds,
                    max = self.max_iterations,
                    "tool loop reached maximum iterations"
                );
                history.push(Message::assistant(ITERATION_LIMIT_REPLY));
                return TurnReport {
                    text: ITERATION_LIMIT_REPLY.to_string(),
                    outcome: TurnOutcome::IterationLimit,
                    rounds,
                    tool_calls: dispatched,
                };
            }
            rounds += 1;
            debug!(round = rounds, calls = calls.len(), "executing tool calls");

            history.push(Message::assistant_with_calls(
                text.unwrap_or_default(),
                calls.clone(),
            ));
            for call in &calls {
                let payload = self.dispatch(call).await;
                history.push(Message::tool(call.id.clone(), payload.to_string()));
                dispatched += 1;
            }
        }
    }

    fn build_messages(&self, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.extend_from_slice(history);
        messages
    }

    /// Run one tool call and return its result payload.
    ///
    /// The tool runs on its own task so that a panic inside it is reported
    /// as an error payload instead of unwinding through the turn.
    async fn dispatch(&self, call: &ToolCallRequest) -> Value {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "model requested unknown tool");
            return ToolError::NotFound(call.name.clone()).to_payload();
        };

        info!(tool = %call.name, call_id = %call.id, "calling tool");
        let arguments = call.arguments.clone();
        let result = tokio::spawn(async move { tool.call(arguments).await })
            .await
            .unwrap_or_else(|e| Err(ToolError::Execution(format!("tool task failed: {e}"))));

        match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                e.to_payload()
            }
        }
    }
}
