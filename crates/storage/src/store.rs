//! SQLite record store implementation.

use crate::{
    CallLog, DailySpending, EatingReport, Error, FoodCount, FoodFrequency, FunctionCallReport,
    MealRecord, Result,
};
use chrono::{Duration, Local, Utc};
use rusqlite::{Connection, Row, params};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// SQLite-backed store for meals and the tool-call log.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open or create a store at the given path, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        debug!(path = %path.display(), "opened record store");
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS eating_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT,
                food TEXT,
                money TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS function_calls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                function_name TEXT,
                arguments TEXT,
                called_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_eating_records_date
                ON eating_records(date);
            "#,
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Meals
    // ─────────────────────────────────────────────────────────────────────

    /// Save a meal. All three fields must be non-blank.
    pub fn save_meal(&self, date: &str, food: &str, money: &str) -> Result<i64> {
        if [date, food, money].iter().any(|f| f.trim().is_empty()) {
            return Err(Error::InvalidRecord(
                "date, food and money must not be empty".into(),
            ));
        }
        self.conn.execute(
            "INSERT INTO eating_records (date, food, money) VALUES (?1, ?2, ?3)",
            params![date, food, money],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, date, food, money, "saved meal");
        Ok(id)
    }

    /// All meals, newest first.
    pub fn all_meals(&self) -> Result<Vec<MealRecord>> {
        self.query_meals(
            "SELECT date, food, money FROM eating_records ORDER BY created_at DESC, id DESC",
            [],
        )
    }

    /// Meals logged for `date`, in insertion order.
    pub fn meals_by_date(&self, date: &str) -> Result<Vec<MealRecord>> {
        self.query_meals(
            "SELECT date, food, money FROM eating_records WHERE date = ?1 ORDER BY created_at, id",
            [date],
        )
    }

    /// The `limit` most recent meals, newest first.
    pub fn recent_meals(&self, limit: usize) -> Result<Vec<MealRecord>> {
        self.query_meals(
            "SELECT date, food, money FROM eating_records ORDER BY created_at DESC, id DESC LIMIT ?1",
            [limit as i64],
        )
    }

    fn query_meals<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<MealRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let meals = stmt
            .query_map(params, meal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(meals)
    }

    pub fn meal_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM eating_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Sum of every meal's amount. Non-numeric amounts count as zero.
    pub fn total_spending(&self) -> Result<f64> {
        let total: Option<f64> = self.conn.query_row(
            "SELECT SUM(CAST(money AS REAL)) FROM eating_records",
            [],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0.0))
    }

    /// Foods eaten on or after `days` ago, most frequent first.
    pub fn food_frequency(&self, days: i64) -> Result<Vec<FoodFrequency>> {
        let start = (Local::now() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();
        let mut stmt = self.conn.prepare(
            "SELECT food, COUNT(*) AS count, GROUP_CONCAT(DISTINCT date) AS dates
             FROM eating_records
             WHERE date >= ?1
             GROUP BY food
             ORDER BY count DESC, food",
        )?;
        let foods = stmt
            .query_map([start], |row| {
                let count: i64 = row.get(1)?;
                let dates: Option<String> = row.get(2)?;
                Ok(FoodFrequency {
                    food: row.get(0)?,
                    count: count as u64,
                    dates: dates
                        .map(|d| d.split(',').map(str::to_string).collect())
                        .unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(foods)
    }

    /// The ten most frequent foods overall.
    pub fn top_foods(&self) -> Result<Vec<FoodCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT food, COUNT(*) AS count FROM eating_records
             GROUP BY food ORDER BY count DESC, food LIMIT 10",
        )?;
        let foods = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok(FoodCount {
                    food: row.get(0)?,
                    count: count as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(foods)
    }

    /// Spending per logged date, in date order.
    pub fn daily_spending(&self) -> Result<Vec<DailySpending>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, SUM(CAST(money AS REAL)) AS daily_total FROM eating_records
             GROUP BY date ORDER BY date",
        )?;
        let days = stmt
            .query_map([], |row| {
                let total: Option<f64> = row.get(1)?;
                Ok(DailySpending {
                    date: row.get(0)?,
                    total: total.unwrap_or(0.0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    pub fn eating_report(&self) -> Result<EatingReport> {
        let daily_spending = self.daily_spending()?;
        let total_spending: f64 = daily_spending.iter().map(|d| d.total).sum();
        let avg_daily_spending = if daily_spending.is_empty() {
            0.0
        } else {
            total_spending / daily_spending.len() as f64
        };

        Ok(EatingReport {
            total_records: self.meal_count()?,
            total_spending,
            avg_daily_spending,
            top_foods: self.top_foods()?,
            daily_spending,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tool-call audit log
    // ─────────────────────────────────────────────────────────────────────

    /// Record that a tool was invoked with `arguments`.
    ///
    /// Non-object arguments are stored as `{"data": "<text>"}`.
    pub fn log_call(&self, function_name: &str, arguments: &Value) -> Result<()> {
        let arguments = match arguments {
            Value::Object(_) => arguments.clone(),
            other => json!({ "data": other.to_string() }),
        };
        self.conn.execute(
            "INSERT INTO function_calls (function_name, arguments) VALUES (?1, ?2)",
            params![function_name, serde_json::to_string(&arguments)?],
        )?;
        debug!(function = function_name, "logged tool call");
        Ok(())
    }

    /// The `limit` most recent tool calls, newest first.
    pub fn recent_calls(&self, limit: usize) -> Result<Vec<CallLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT function_name, arguments, called_at FROM function_calls
             ORDER BY called_at DESC, id DESC LIMIT ?1",
        )?;
        let logs = stmt
            .query_map([limit as i64], |row| {
                let raw: String = row.get(1)?;
                Ok(CallLog {
                    function_name: row.get(0)?,
                    arguments: decode_logged_arguments(raw),
                    called_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Number of calls per tool name.
    pub fn call_counts(&self) -> Result<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT function_name, COUNT(*) FROM function_calls GROUP BY function_name",
        )?;
        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, count as u64))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(counts)
    }

    /// Calls per day and tool over the last `days` days (UTC dates).
    pub fn calls_by_day(&self, days: i64) -> Result<BTreeMap<String, BTreeMap<String, u64>>> {
        let start = (Utc::now() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();
        let mut stmt = self.conn.prepare(
            "SELECT function_name, COUNT(*), strftime('%Y-%m-%d', called_at) AS call_date
             FROM function_calls
             WHERE strftime('%Y-%m-%d', called_at) >= ?1
             GROUP BY function_name, call_date
             ORDER BY call_date",
        )?;
        let rows = stmt
            .query_map([start], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(2)?, row.get::<_, String>(0)?, count as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut activity: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for (date, function, count) in rows {
            activity.entry(date).or_default().insert(function, count);
        }
        Ok(activity)
    }

    pub fn function_call_report(&self) -> Result<FunctionCallReport> {
        let function_breakdown = self.call_counts()?;
        Ok(FunctionCallReport {
            total_calls: function_breakdown.values().sum(),
            function_breakdown,
            recent_activity: self.calls_by_day(7)?,
        })
    }
}

fn meal_from_row(row: &Row<'_>) -> rusqlite::Result<MealRecord> {
    Ok(MealRecord {
        date: row.get(0)?,
        food: row.get(1)?,
        money: row.get(2)?,
    })
}

fn decode_logged_arguments(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "unreadable logged arguments");
        json!({ "error": "unreadable arguments", "raw": raw })
    })
}
