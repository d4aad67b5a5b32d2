use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur while dispatching a tool call.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Execution(_) => "execution",
        }
    }

    /// The error-shaped result payload fed back to the model.
    pub fn to_payload(&self) -> Value {
        json!({
            "status": "error",
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}
