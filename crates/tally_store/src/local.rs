//! Canonical local store for habits and completion records.
//!
//! Mutations are applied here optimistically at enqueue time, exactly once,
//! regardless of connectivity. The sync engine never re-applies local state
//! when a remote call later succeeds.

use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tally_common::{new_token, now_ms, start_of_day, ActionKind, Habit, HabitInstance, Result};

/// Aggregate counters for a user's dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub habit_count: usize,
    pub total_streaks: u32,
}

pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a mutation to the canonical local state.
    pub fn apply(&self, kind: &ActionKind) -> Result<()> {
        match kind {
            ActionKind::CreateHabit(habit) => self.insert_habit(habit),
            ActionKind::UpdateHabit(habit) => self.update_habit(habit),
            ActionKind::DeleteHabit { habit_id } => self.delete_habit(habit_id),
            ActionKind::CompleteHabit { habit_id, date } => {
                self.complete_habit(habit_id, *date).map(|_| ())
            }
        }
    }

    pub fn insert_habit(&self, habit: &Habit) -> Result<()> {
        habit.validate()?;
        self.conn().execute(
            "INSERT INTO habits (id, user_id, title, category, frequency, selected_days,
                                 reminder_time, start_date, notes, streak_count,
                                 last_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                habit.id,
                habit.user_id,
                habit.title,
                habit.category,
                habit.frequency,
                habit.selected_days,
                habit.reminder_time,
                habit.start_date,
                habit.notes,
                habit.streak_count,
                habit.last_completed,
                habit.created_at,
                habit.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        habit.validate()?;
        let changed = self.conn().execute(
            "UPDATE habits SET title = ?2, category = ?3, frequency = ?4,
                               selected_days = ?5, reminder_time = ?6, start_date = ?7,
                               notes = ?8, streak_count = ?9, last_completed = ?10,
                               updated_at = ?11
             WHERE id = ?1",
            params![
                habit.id,
                habit.title,
                habit.category,
                habit.frequency,
                habit.selected_days,
                habit.reminder_time,
                habit.start_date,
                habit.notes,
                habit.streak_count,
                habit.last_completed,
                habit.updated_at
            ],
        )?;
        if changed == 0 {
            tracing::warn!(id = %habit.id, "update for unknown habit ignored");
        }
        Ok(())
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM habits WHERE id = ?1", [habit_id])?;
        Ok(())
    }

    pub fn get_habit(&self, habit_id: &str) -> Result<Option<Habit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM habits WHERE id = ?1")?;
        let mut rows = stmt.query([habit_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_habit(row)?)),
            None => Ok(None),
        }
    }

    /// All habits for a user, newest first.
    pub fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM habits WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let habits = stmt
            .query_map([user_id], |row| row_to_habit(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(habits)
    }

    /// Record a completion for `(habit_id, date)`.
    ///
    /// Idempotent per calendar day: a repeat completion for the same day is
    /// a no-op, and the streak counter increments at most once per day
    /// (local business rule, mirrored by the remote side's own check).
    /// Returns the updated habit, or `None` if the habit is unknown.
    pub fn complete_habit(&self, habit_id: &str, date: i64) -> Result<Option<Habit>> {
        let day = start_of_day(date);
        let now = now_ms();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let habit = {
            let mut stmt = tx.prepare("SELECT * FROM habits WHERE id = ?1")?;
            let mut rows = stmt.query([habit_id])?;
            match rows.next()? {
                Some(row) => row_to_habit(row)?,
                None => {
                    tracing::warn!(habit_id, "completion for unknown habit ignored");
                    return Ok(None);
                }
            }
        };

        let existing: Option<(String, bool)> = {
            let mut stmt = tx.prepare(
                "SELECT id, completed FROM habit_instances
                 WHERE habit_id = ?1 AND date = ?2",
            )?;
            let mut rows = stmt.query(params![habit_id, day])?;
            match rows.next()? {
                Some(row) => Some((row.get(0)?, row.get(1)?)),
                None => None,
            }
        };

        match existing {
            None => {
                tx.execute(
                    "INSERT INTO habit_instances (id, habit_id, date, completed, completed_at)
                     VALUES (?1, ?2, ?3, 1, ?4)",
                    params![new_token(), habit_id, day, now],
                )?;
            }
            Some((instance_id, false)) => {
                tx.execute(
                    "UPDATE habit_instances SET completed = 1, completed_at = ?2 WHERE id = ?1",
                    params![instance_id, now],
                )?;
            }
            Some((_, true)) => {} // already completed for this day
        }

        let already_counted = habit
            .last_completed
            .map(start_of_day)
            .is_some_and(|last_day| last_day == day);
        let streak = if already_counted {
            habit.streak_count
        } else {
            habit.streak_count + 1
        };

        tx.execute(
            "UPDATE habits SET streak_count = ?2, last_completed = ?3, updated_at = ?4
             WHERE id = ?1",
            params![habit_id, streak, day, now],
        )?;
        tx.commit()?;
        drop(conn);

        self.get_habit(habit_id)
    }

    pub fn get_instance(&self, habit_id: &str, date: i64) -> Result<Option<HabitInstance>> {
        let day = start_of_day(date);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, habit_id, date, completed, completed_at
             FROM habit_instances WHERE habit_id = ?1 AND date = ?2",
        )?;
        let mut rows = stmt.query(params![habit_id, day])?;
        match rows.next()? {
            Some(row) => Ok(Some(HabitInstance {
                id: row.get(0)?,
                habit_id: row.get(1)?,
                date: row.get(2)?,
                completed: row.get(3)?,
                completed_at: row.get(4)?,
            })),
            None => Ok(None),
        }
    }

    /// How many habits were completed on the given day.
    pub fn completed_count_for_date(&self, date: i64) -> Result<usize> {
        let day = start_of_day(date);
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM habit_instances WHERE date = ?1 AND completed = 1",
            [day],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Total completion count for one habit.
    pub fn completed_count(&self, habit_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM habit_instances WHERE habit_id = ?1 AND completed = 1",
            [habit_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        let (habit_count, total_streaks): (i64, i64) = self.conn().query_row(
            "SELECT COUNT(*), COALESCE(SUM(streak_count), 0) FROM habits WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(UserStats {
            habit_count: habit_count as usize,
            total_streaks: total_streaks as u32,
        })
    }
}

fn row_to_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        category: row.get("category")?,
        frequency: row.get("frequency")?,
        selected_days: row.get("selected_days")?,
        reminder_time: row.get("reminder_time")?,
        start_date: row.get("start_date")?,
        notes: row.get("notes")?,
        streak_count: row.get("streak_count")?,
        last_completed: row.get("last_completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
