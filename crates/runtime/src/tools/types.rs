//! Tool-related types.

use super::ToolError;
use crate::llm::Arguments;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Description of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new("string", description)
    }
}

/// Parameters a tool accepts, and which of them are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: BTreeSet<String>,
}

impl ParameterSchema {
    /// Schema with no parameters and nothing required.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a schema, rejecting required names that are not declared.
    pub fn new<I, S>(properties: BTreeMap<String, ParameterSpec>, required: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = Self {
            properties,
            required: required.into_iter().map(Into::into).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Check that `required` is a subset of the declared properties.
    pub fn validate(&self) -> Result<()> {
        let undeclared: Vec<&str> = self
            .required
            .iter()
            .filter(|name| !self.properties.contains_key(*name))
            .map(String::as_str)
            .collect();
        if undeclared.is_empty() {
            Ok(())
        } else {
            Err(Error::Registry(format!(
                "required parameters not declared: {}",
                undeclared.join(", ")
            )))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// JSON Schema object form.
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// A spec whose tool takes no parameters.
    pub fn empty(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterSchema::empty())
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.parameters.required
    }
}

/// Read a string argument, accepting numbers and booleans as their text form.
pub fn optional_string(arguments: &Arguments, key: &str) -> Option<String> {
    match arguments.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a mandatory, non-blank string argument.
pub fn required_string(
    arguments: &Arguments,
    key: &str,
) -> std::result::Result<String, ToolError> {
    optional_string(arguments, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing argument: {key}")))
}
