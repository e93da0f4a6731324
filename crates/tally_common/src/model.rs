//! Core domain entities: habits and their completion records.
//!
//! Field names serialize in camelCase to match the REST backend's wire shape.

use crate::{Result, SyncError};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Truncate an epoch-millisecond timestamp to the start of its UTC day.
pub fn start_of_day(timestamp_ms: i64) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    timestamp_ms.div_euclid(DAY_MS) * DAY_MS
}

/// How often a habit is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    /// Specific weekdays, stored in `Habit::selected_days`.
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Custom => "Custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Daily" => Ok(Frequency::Daily),
            "Weekly" => Ok(Frequency::Weekly),
            "Custom" => Ok(Frequency::Custom),
            other => Err(SyncError::Validation(format!(
                "unknown frequency: {other}"
            ))),
        }
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| {
            FromSqlError::Other(Box::new(std::io::Error::other(format!("{e}"))))
        })
    }
}

/// A tracked habit.
///
/// Invariants: `streak_count >= 0` (by construction) and
/// `updated_at >= created_at`, checked by [`Habit::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub frequency: Frequency,
    /// Comma-separated weekday indices (0=Sunday..6=Saturday), only
    /// meaningful when `frequency` is `Custom`.
    #[serde(default)]
    pub selected_days: String,
    #[serde(default)]
    pub reminder_time: Option<i64>,
    pub start_date: i64,
    #[serde(default)]
    pub notes: String,
    pub streak_count: u32,
    #[serde(default)]
    pub last_completed: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Habit {
    /// New daily habit with a client-generated id and fresh timestamps.
    ///
    /// The id is generated on the client so that re-sending a create after a
    /// lost acknowledgement cannot produce a duplicate remote record.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: crate::action::new_token(),
            user_id: user_id.into(),
            title: title.into(),
            category: String::new(),
            frequency: Frequency::Daily,
            selected_days: String::new(),
            reminder_time: None,
            start_date: now,
            notes: String::new(),
            streak_count: 0,
            last_completed: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the habit's own invariants.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SyncError::Validation("habit title cannot be empty".into()));
        }
        if self.updated_at < self.created_at {
            return Err(SyncError::Validation(format!(
                "updated_at {} precedes created_at {}",
                self.updated_at, self.created_at
            )));
        }
        if self.frequency == Frequency::Custom && self.selected_day_indices()?.is_empty() {
            return Err(SyncError::Validation(
                "custom frequency requires at least one selected day".into(),
            ));
        }
        Ok(())
    }

    /// Parse `selected_days` into weekday indices.
    pub fn selected_day_indices(&self) -> Result<Vec<u8>> {
        self.selected_days
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let day: u8 = part.parse().map_err(|_| {
                    SyncError::Validation(format!("invalid weekday index: {part}"))
                })?;
                if day > 6 {
                    return Err(SyncError::Validation(format!(
                        "weekday index out of range: {day}"
                    )));
                }
                Ok(day)
            })
            .collect()
    }
}

/// One completion record; at most one exists per `(habit_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitInstance {
    pub id: String,
    pub habit_id: String,
    /// Start-of-day timestamp in epoch milliseconds.
    pub date: i64,
    pub completed: bool,
    pub completed_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_day_truncates() {
        // 2024-01-15 13:45:12 UTC
        let ts = 1_705_326_312_000;
        let day = start_of_day(ts);
        assert_eq!(day % (24 * 60 * 60 * 1000), 0);
        assert!(day <= ts && ts - day < 24 * 60 * 60 * 1000);
        assert_eq!(start_of_day(day), day);
    }

    #[test]
    fn new_habit_is_valid() {
        let habit = Habit::new("u1", "Read");
        assert!(habit.validate().is_ok());
        assert_eq!(habit.streak_count, 0);
        assert!(habit.updated_at >= habit.created_at);
    }

    #[test]
    fn custom_frequency_requires_days() {
        let mut habit = Habit::new("u1", "Gym");
        habit.frequency = Frequency::Custom;
        assert!(habit.validate().is_err());

        habit.selected_days = "1,3,5".to_string();
        assert!(habit.validate().is_ok());
        assert_eq!(habit.selected_day_indices().unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn selected_days_rejects_out_of_range() {
        let mut habit = Habit::new("u1", "Gym");
        habit.selected_days = "2,9".to_string();
        assert!(habit.selected_day_indices().is_err());
    }

    #[test]
    fn habit_round_trips_as_camel_case_json() {
        let habit = Habit::new("u1", "Run");
        let json = serde_json::to_value(&habit).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("streakCount").is_some());
        let back: Habit = serde_json::from_value(json).unwrap();
        assert_eq!(back, habit);
    }
}
