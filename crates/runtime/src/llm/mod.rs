//! Provider-agnostic conversation vocabulary.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{Arguments, AssistantOutcome, Message, Role, ToolCallRequest};
