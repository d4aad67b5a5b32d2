//! Built-in eatlog tools.
//!
//! Every tool answers with a `{"status": "success", ...}` payload on success
//! and a [`ToolError`] otherwise; the agent turns errors into the matching
//! error envelope. Each invocation is written to the call log before it runs,
//! except those of `get_function_stats`, which reports on that log.

mod files;
mod meals;
mod recommend;
mod stats;

pub use files::{ListDirectory, ReadFile, WriteFile};
pub use meals::{GetAllRecords, GetEatingStats, GetRecordsByDate, GetTotalSpending, RecordThing};
pub use recommend::{GENERIC_DISHES, MealPeriod, Recommendation, RecommendFood, recommend};
pub use stats::GetFunctionStats;

use runtime::{Arguments, ParameterSpec, ToolError, ToolRegistry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storage::RecordStore;
use tracing::warn;

/// Record store shared between tools.
pub type SharedStore = Arc<Mutex<RecordStore>>;

pub fn shared(store: RecordStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Build a registry holding every built-in tool, backed by `store`.
pub fn default_registry(store: SharedStore) -> runtime::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register_with_schema(
        Arc::new(RecordThing::new(store.clone())),
        string_params(&[("date", "日期"), ("eat", "食物"), ("money", "金额")]),
        ["date", "eat", "money"],
    )?;
    registry.register(Arc::new(GetAllRecords::new(store.clone())), None)?;
    registry.register_with_schema(
        Arc::new(GetRecordsByDate::new(store.clone())),
        string_params(&[("date", "要查询的日期，例如 2025-03-02")]),
        ["date"],
    )?;
    registry.register(Arc::new(GetTotalSpending::new(store.clone())), None)?;
    registry.register(Arc::new(GetEatingStats::new(store.clone())), None)?;
    registry.register(Arc::new(RecommendFood::new(store.clone())), None)?;

    registry.register_with_schema(
        Arc::new(ReadFile::new(store.clone())),
        string_params(&[("file_path", "文件路径")]),
        ["file_path"],
    )?;
    registry.register_with_schema(
        Arc::new(WriteFile::new(store.clone())),
        string_params(&[("file_path", "文件路径"), ("content", "要写入的内容")]),
        ["file_path", "content"],
    )?;
    registry.register_with_schema(
        Arc::new(ListDirectory::new(store.clone())),
        string_params(&[("directory_path", "目录路径，默认为当前目录")]),
        Vec::<String>::new(),
    )?;

    registry.register(Arc::new(GetFunctionStats::new(store)), None)?;
    Ok(registry)
}

fn string_params(params: &[(&str, &str)]) -> BTreeMap<String, ParameterSpec> {
    params
        .iter()
        .map(|(name, description)| (name.to_string(), ParameterSpec::string(*description)))
        .collect()
}

fn lock(store: &SharedStore) -> MutexGuard<'_, RecordStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` against the store, mapping storage failures to tool errors.
fn with_store<T>(
    store: &SharedStore,
    f: impl FnOnce(&RecordStore) -> storage::Result<T>,
) -> Result<T, ToolError> {
    f(&lock(store)).map_err(|e| ToolError::Execution(format!("数据库操作失败: {e}")))
}

/// Write the invocation to the call log. Logging failures never fail the tool.
fn log_call(store: &SharedStore, name: &str, arguments: &Arguments) {
    let arguments = Value::Object(arguments.clone());
    if let Err(e) = lock(store).log_call(name, &arguments) {
        warn!(tool = name, error = %e, "failed to log tool call");
    }
}
