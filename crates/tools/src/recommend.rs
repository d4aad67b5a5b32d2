//! Meal recommendation based on the time of day and recent eating history.

use crate::{SharedStore, log_call, with_store};
use async_trait::async_trait;
use chrono::{Local, Timelike};
use runtime::{Arguments, Tool, ToolError};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use storage::FoodFrequency;

/// Home-cooking suggestions used when nothing has been recorded yet.
pub const GENERIC_DISHES: [&str; 4] = ["番茄炒蛋", "青椒肉丝", "紫菜蛋花汤", "清炒时蔬"];

/// How many suggestions a recommendation carries at most.
const MAX_SUGGESTIONS: usize = 3;
/// Foods eaten this often recently are not suggested again.
const FREQUENT_FOODS: usize = 3;
const HISTORY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MealPeriod {
    #[serde(rename = "早餐")]
    Breakfast,
    #[serde(rename = "午餐")]
    Lunch,
    #[serde(rename = "晚餐")]
    Dinner,
    #[serde(rename = "加餐")]
    Snack,
}

impl MealPeriod {
    /// Period for a local hour (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => MealPeriod::Breakfast,
            11..=13 => MealPeriod::Lunch,
            17..=20 => MealPeriod::Dinner,
            _ => MealPeriod::Snack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealPeriod::Breakfast => "早餐",
            MealPeriod::Lunch => "午餐",
            MealPeriod::Dinner => "晚餐",
            MealPeriod::Snack => "加餐",
        }
    }

    pub fn menu(&self) -> &'static [&'static str] {
        match self {
            MealPeriod::Breakfast => &[
                "小米粥配咸菜",
                "豆浆油条",
                "鸡蛋三明治",
                "燕麦片配水果",
                "包子豆浆",
            ],
            MealPeriod::Lunch => &[
                "宫保鸡丁",
                "麻婆豆腐",
                "红烧肉",
                "西红柿鸡蛋面",
                "鱼香肉丝",
            ],
            MealPeriod::Dinner => &[
                "清蒸鱼",
                "蒜蓉西兰花",
                "冬瓜排骨汤",
                "凉拌黄瓜",
                "白切鸡",
            ],
            MealPeriod::Snack => &["水果拼盘", "酸奶", "坚果", "全麦面包", "绿茶"],
        }
    }
}

impl fmt::Display for MealPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub recommendations: Vec<String>,
    pub reason: String,
    pub time_period: MealPeriod,
    /// Frequently eaten foods that were filtered out.
    pub recent_foods: Vec<String>,
}

/// Pick suggestions for `period`.
///
/// `recent` is the food frequency of the last week, most frequent first.
/// With no history at all, generic home-cooking dishes are suggested.
pub fn recommend(
    period: MealPeriod,
    recent: &[FoodFrequency],
    has_history: bool,
) -> Recommendation {
    if !has_history {
        return Recommendation {
            recommendations: GENERIC_DISHES.iter().map(|d| d.to_string()).collect(),
            reason: "还没有饮食记录，建议您可以尝试一些简单的家常菜".to_string(),
            time_period: period,
            recent_foods: Vec::new(),
        };
    }

    let frequent: Vec<String> = recent
        .iter()
        .take(FREQUENT_FOODS)
        .map(|f| f.food.clone())
        .collect();

    let mut picks: Vec<String> = period
        .menu()
        .iter()
        .filter(|dish| !frequent.iter().any(|food| dish.contains(food.as_str())))
        .take(MAX_SUGGESTIONS)
        .map(|dish| dish.to_string())
        .collect();
    // Everything on the menu was eaten recently; suggest it anyway.
    if picks.is_empty() {
        picks = period
            .menu()
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(|dish| dish.to_string())
            .collect();
    }

    let reason = if frequent.is_empty() {
        format!("现在是{period}时间，为您推荐适合的{period}")
    } else {
        format!(
            "现在是{period}时间，您最近常吃{}，换换口味试试这些吧",
            frequent.join("、")
        )
    };

    Recommendation {
        recommendations: picks,
        reason,
        time_period: period,
        recent_foods: frequent,
    }
}

/// Suggests food for the current meal period.
pub struct RecommendFood {
    store: SharedStore,
}

impl RecommendFood {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecommendFood {
    fn name(&self) -> &str {
        "recommend_food"
    }

    fn description(&self) -> &str {
        "基于用户最近的饮食历史和当前时间推荐食物"
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        log_call(&self.store, self.name(), &arguments);

        let (recent, has_history) = with_store(&self.store, |s| {
            Ok((s.food_frequency(HISTORY_DAYS)?, s.meal_count()? > 0))
        })?;
        let period = MealPeriod::from_hour(Local::now().hour());
        let recommendation = recommend(period, &recent, has_history);

        let mut payload = serde_json::to_value(&recommendation)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        if let Value::Object(map) = &mut payload {
            map.insert("status".into(), json!("success"));
        }
        Ok(payload)
    }
}
