//! Tool trait, specs, and the registry that dispatches them.

pub mod errors;
mod registry;
mod r#trait;
mod types;

pub use errors::ToolError;
pub use registry::{Callables, RegistryStats, ToolRegistry};
pub use r#trait::Tool;
pub use types::{ParameterSchema, ParameterSpec, ToolSpec, optional_string, required_string};
