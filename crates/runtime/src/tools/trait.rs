//! Tool trait.

use crate::llm::Arguments;
use crate::tools::ToolError;
use async_trait::async_trait;
use serde_json::Value;

/// A callable the model may invoke mid-conversation.
///
/// Name and description are the tool's declared metadata; the parameter
/// schema is attached when the tool is registered.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the tool. The returned value is the success payload.
    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError>;
}
