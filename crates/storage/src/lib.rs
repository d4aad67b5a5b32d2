//! SQLite-backed record storage for eatlog.
//!
//! Holds two tables: the meal log (`eating_records`) and an audit trail of
//! every tool invocation (`function_calls`), plus the aggregate queries the
//! statistics tools report on.
//!
//! # Example
//!
//! ```no_run
//! use storage::RecordStore;
//!
//! let store = RecordStore::open("agent_records.db")?;
//! store.save_meal("2025-03-02", "蛋糕", "998")?;
//! store.log_call("record_thing", &serde_json::json!({"eat": "蛋糕"}))?;
//!
//! for meal in store.all_meals()? {
//!     println!("{}: {} ({})", meal.date, meal.food, meal.money);
//! }
//! println!("total: {}", store.total_spending()?);
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod record;
mod store;

pub use error::{Error, Result};
pub use record::{
    CallLog, DailySpending, EatingReport, FoodCount, FoodFrequency, FunctionCallReport, MealRecord,
};
pub use store::RecordStore;
