//! eatlog runtime: tool-calling conversation orchestration.
//!
//! This crate is the core of the assistant. It translates a provider-agnostic
//! message and tool vocabulary into a model provider's wire format, runs the
//! "ask model, execute tools, feed results back" loop until a final answer
//! is produced, and keeps a bounded, expiring history per session.
//!
//! # Overview
//!
//! - **ToolRegistry**: the tools that exist and how they are invoked.
//! - **Provider**: the adapter to a model API ([`ChatCompletionsProvider`]).
//! - **Agent**: drives one turn through the reason/act loop.
//! - **SessionStore**: per-session histories with capacity and expiry.
//! - **Assistant**: the turn-processing entry point tying them together.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Agent, Assistant, ChatCompletionsProvider, SessionStore, ToolRegistry};
//!
//! # async fn example() {
//! let provider = ChatCompletionsProvider::builder("api-key").build();
//! let agent = Agent::new(provider, ToolRegistry::new()).with_system_prompt("Be concise.");
//! let assistant = Assistant::new(agent, SessionStore::default());
//!
//! let reply = assistant.process("default", "Hello!").await;
//! println!("{reply}");
//! # }
//! ```

mod agent;
mod assistant;
mod error;
pub mod llm;
pub mod providers;
mod session;
pub mod tools;

pub use agent::{Agent, DEFAULT_MAX_ITERATIONS, ITERATION_LIMIT_REPLY, TurnOutcome, TurnReport};
pub use assistant::{Assistant, AssistantStats};
pub use error::{Error, Result};
pub use llm::{Arguments, AssistantOutcome, Message, ModelError, Role, ToolCallRequest};
pub use providers::{ChatCompletionsProvider, Provider, ToolFidelity};
pub use session::{SessionConfig, SessionHandle, SessionStore};
pub use tools::{
    ParameterSchema, ParameterSpec, RegistryStats, Tool, ToolError, ToolRegistry, ToolSpec,
};
