use crate::{SharedStore, with_store};
use async_trait::async_trait;
use runtime::{Arguments, Tool, ToolError};
use serde_json::{Value, json};

/// Reports how often each tool has been called.
///
/// Its own calls are not logged, so repeated calls with no other tool
/// activity in between return the same report.
pub struct GetFunctionStats {
    store: SharedStore,
}

impl GetFunctionStats {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetFunctionStats {
    fn name(&self) -> &str {
        "get_function_stats"
    }

    fn description(&self) -> &str {
        "获取函数调用统计，包括总调用次数、各函数调用次数和最近7天的调用情况"
    }

    async fn call(&self, _arguments: Arguments) -> Result<Value, ToolError> {
        let report = with_store(&self.store, |s| s.function_call_report())?;
        Ok(json!({ "status": "success", "stats": report }))
    }
}
