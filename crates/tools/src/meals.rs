//! Meal log tools: record, query and summarize meals.

use crate::{SharedStore, log_call, with_store};
use async_trait::async_trait;
use runtime::tools::required_string;
use runtime::{Arguments, Tool, ToolError};
use serde_json::{Value, json};
use tracing::info;

/// Records one meal: date, food and amount spent.
pub struct RecordThing {
    store: SharedStore,
}

impl RecordThing {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecordThing {
    fn name(&self) -> &str {
        "record_thing"
    }

    fn description(&self) -> &str {
        "记录用户的饮食和消费信息，需要日期(date)、食物(eat)和金额(money)"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);

        let date = required_string(&arguments, "date")?;
        let food = required_string(&arguments, "eat")?;
        let money = required_string(&arguments, "money")?;

        let id = with_store(&self.store, |s| s.save_meal(&date, &food, &money))?;
        info!(id, %date, %food, %money, "meal recorded");

        Ok(json!({
            "status": "success",
            "message": format!("已记录：{date}吃了{food}，花费{money}"),
            "record": { "date": date, "food": food, "money": money },
        }))
    }
}

/// Lists every recorded meal, newest first.
pub struct GetAllRecords {
    store: SharedStore,
}

impl GetAllRecords {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetAllRecords {
    fn name(&self) -> &str {
        "get_all_records"
    }

    fn description(&self) -> &str {
        "查询所有饮食记录"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let records = with_store(&self.store, |s| s.all_meals())?;
        Ok(json!({
            "status": "success",
            "count": records.len(),
            "records": records,
        }))
    }
}

pub struct GetRecordsByDate {
    store: SharedStore,
}

impl GetRecordsByDate {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetRecordsByDate {
    fn name(&self) -> &str {
        "get_records_by_date"
    }

    fn description(&self) -> &str {
        "查询特定日期的饮食记录"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let date = required_string(&arguments, "date")?;
        let records = with_store(&self.store, |s| s.meals_by_date(&date))?;
        Ok(json!({
            "status": "success",
            "date": date,
            "count": records.len(),
            "records": records,
        }))
    }
}

pub struct GetTotalSpending {
    store: SharedStore,
}

impl GetTotalSpending {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTotalSpending {
    fn name(&self) -> &str {
        "get_total_spending"
    }

    fn description(&self) -> &str {
        "获取总消费金额"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let total = with_store(&self.store, |s| s.total_spending())?;
        Ok(json!({ "status": "success", "total_spending": total }))
    }
}

/// Aggregate eating report: totals, top foods, spending per day.
pub struct GetEatingStats {
    store: SharedStore,
}

impl GetEatingStats {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetEatingStats {
    fn name(&self) -> &str {
        "get_eating_stats"
    }

    fn description(&self) -> &str {
        "获取饮食统计信息，包括记录数、总消费、日均消费和最常吃的食物"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);
        let report = with_store(&self.store, |s| s.eating_report())?;
        Ok(json!({ "status": "success", "stats": report }))
    }
}
