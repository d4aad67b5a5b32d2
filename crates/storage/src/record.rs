//! Record and report types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One logged meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub date: String,
    pub food: String,
    pub money: String,
}

/// One logged tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    pub function_name: String,
    pub arguments: Value,
    pub called_at: String,
}

/// How often a food was eaten in a window, and on which dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodFrequency {
    pub food: String,
    pub count: u64,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodCount {
    pub food: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpending {
    pub date: String,
    pub total: f64,
}

/// Aggregate view of the meal log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EatingReport {
    pub total_records: u64,
    pub total_spending: f64,
    pub avg_daily_spending: f64,
    /// Ten most frequent foods, most frequent first.
    pub top_foods: Vec<FoodCount>,
    pub daily_spending: Vec<DailySpending>,
}

/// Aggregate view of the tool-call audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallReport {
    pub total_calls: u64,
    pub function_breakdown: BTreeMap<String, u64>,
    /// Calls per day over the last week: `date -> function -> count`.
    pub recent_activity: BTreeMap<String, BTreeMap<String, u64>>,
}
