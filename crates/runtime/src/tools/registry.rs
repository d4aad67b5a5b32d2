//! Tool registry: the set of invocable tools and their specs.

use super::{ParameterSchema, ParameterSpec, Tool, ToolSpec};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Dispatch table from tool name to callable.
pub type Callables = HashMap<String, Arc<dyn Tool>>;

/// Summary of what is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_tools: usize,
    pub tool_names: Vec<String>,
}

/// Maps tool names to callables and their specs.
///
/// Meant to be filled during setup and read-only while turns are running;
/// callers that mutate it at runtime must put it behind a lock.
#[derive(Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    callables: Callables,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, using `schema` or an empty one when absent.
    ///
    /// A tool registered under an existing name replaces the previous entry
    /// and keeps its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>, schema: Option<ParameterSchema>) -> Result<()> {
        let schema = schema.unwrap_or_default();
        schema.validate()?;

        let spec = ToolSpec::new(tool.name(), tool.description(), schema);
        debug!(tool = %spec.name, params = spec.parameters.properties.len(), "registering tool");

        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec.clone(),
            None => self.specs.push(spec.clone()),
        }
        self.callables.insert(spec.name, tool);
        Ok(())
    }

    /// Register a tool with explicit parameter descriptors.
    ///
    /// Fails if `required` names a parameter missing from `properties`.
    pub fn register_with_schema<I, S>(
        &mut self,
        tool: Arc<dyn Tool>,
        properties: BTreeMap<String, ParameterSpec>,
        required: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = ParameterSchema::new(properties, required)?;
        self.register(tool, Some(schema))
    }

    /// Remove a tool. No-op if it is not registered.
    pub fn unregister(&mut self, name: &str) {
        if self.callables.remove(name).is_some() {
            self.specs.retain(|s| s.name != name);
            debug!(tool = %name, "unregistered tool");
        }
    }

    /// All specs, in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn callables(&self) -> &Callables {
        &self.callables
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.callables.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_tools: self.len(),
            tool_names: self.names(),
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Arguments;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::BTreeSet;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        async fn call(&self, _arguments: Arguments) -> std::result::Result<Value, ToolError> {
            Ok(json!({"status": "success", "from": self.1}))
        }
    }

    fn meal_properties() -> BTreeMap<String, ParameterSpec> {
        BTreeMap::from([
            ("date".to_string(), ParameterSpec::string("日期")),
            ("eat".to_string(), ParameterSpec::string("食物")),
            ("money".to_string(), ParameterSpec::string("金额")),
        ])
    }

    #[test]
    fn register_with_schema_exposes_required() {
        let mut registry = ToolRegistry::new();
        registry
            .register_with_schema(
                Arc::new(Named("record_thing", "记录饮食")),
                meal_properties(),
                ["date", "eat", "money"],
            )
            .unwrap();

        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "record_thing");
        let expected: BTreeSet<String> =
            ["date", "eat", "money"].iter().map(|s| s.to_string()).collect();
        assert_eq!(specs[0].required(), &expected);
    }

    #[test]
    fn bad_required_fails_at_registration() {
        let mut registry = ToolRegistry::new();
        let result = registry.register_with_schema(
            Arc::new(Named("record_thing", "记录饮食")),
            meal_properties(),
            ["date", "price"],
        );
        assert!(result.is_err());
        assert!(!registry.has("record_thing"));
    }

    #[test]
    fn register_without_schema_synthesizes_empty() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(Named("get_total_spending", "总消费")), None)
            .unwrap();

        let spec = registry.spec("get_total_spending").unwrap();
        assert!(spec.parameters.is_empty());
        assert!(spec.required().is_empty());
        assert_eq!(spec.description, "总消费");
    }

    #[test]
    fn specs_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(Arc::new(Named(name, "")), None).unwrap();
        }
        assert_eq!(registry.names(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn reregistering_overwrites_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("a", "first")), None).unwrap();
        registry.register(Arc::new(Named("b", "other")), None).unwrap();
        registry.register(Arc::new(Named("a", "second")), None).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.spec("a").unwrap().description, "second");

        let output = registry.get("a").unwrap().call(Arguments::new()).await.unwrap();
        assert_eq!(output["from"], "second");
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("a", "")), None).unwrap();

        registry.unregister("a");
        registry.unregister("a");
        registry.unregister("never");

        assert!(!registry.has("a"));
        assert!(registry.is_empty());
        assert!(registry.callables().is_empty());
    }

    #[test]
    fn stats_report_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("x", "")), None).unwrap();
        let stats = registry.stats();
        assert_eq!(stats.total_tools, 1);
        assert_eq!(stats.tool_names, vec!["x"]);
    }
}
