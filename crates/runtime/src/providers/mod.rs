//! Model provider adapters.
//!
//! A provider turns the abstract conversation into its wire format and
//! back. Provider-side failures never escape: they come back as a
//! [`AssistantOutcome::Final`] describing the failure.

mod chat_completions;

pub use chat_completions::{
    ChatCompletionsProvider, ChatCompletionsProviderBuilder, DEFAULT_BASE_URL, DEFAULT_MODEL,
    FALLBACK_ARGUMENT_KEY, ToolFidelity,
};

use crate::llm::{AssistantOutcome, Message};
use crate::tools::ToolSpec;
use std::future::Future;

/// Trait for model provider backends.
pub trait Provider: Send + Sync {
    /// Ask the model for the next step of the conversation.
    fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> impl Future<Output = AssistantOutcome> + Send;
}
