//! Durable, ordered, append-only queue of pending mutations.
//!
//! Backed by a SQLite table with an AUTOINCREMENT sequence column, so FIFO
//! order is explicit in storage and survives process restarts. Every
//! persistence failure propagates to the caller; an action is never
//! silently dropped.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tally_common::{new_token, now_ms, Action, ActionKind, Result};

pub struct ActionLog {
    conn: Mutex<Connection>,
}

impl ActionLog {
    /// Open or create the log at `path`, independent of the rest of the
    /// app's storage.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("queue.sql"))?;
        tracing::debug!("action log opened at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory log for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("queue.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a new action. The log stamps `enqueued_at` itself, strictly
    /// increasing even if the wall clock steps backwards.
    pub fn enqueue(&self, kind: ActionKind) -> Result<Action> {
        let conn = self.conn();
        let last: i64 = conn.query_row(
            "SELECT COALESCE(MAX(enqueued_at), 0) FROM pending_actions",
            [],
            |row| row.get(0),
        )?;
        let action = Action {
            id: new_token(),
            kind,
            enqueued_at: now_ms().max(last + 1),
        };
        conn.execute(
            "INSERT INTO pending_actions (id, kind, payload, enqueued_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                action.id,
                action.kind.name(),
                serde_json::to_string(&action.kind)?,
                action.enqueued_at
            ],
        )?;
        tracing::debug!(
            kind = action.kind.name(),
            id = %action.id,
            "enqueued offline action"
        );
        Ok(action)
    }

    /// The full ordered pending sequence, oldest first. Does not mutate.
    pub fn peek_all(&self) -> Result<Vec<Action>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, payload, enqueued_at FROM pending_actions ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut actions = Vec::new();
        for row in rows {
            let (id, payload, enqueued_at) = row?;
            let kind: ActionKind = serde_json::from_str(&payload)?;
            actions.push(Action {
                id,
                kind,
                enqueued_at,
            });
        }
        Ok(actions)
    }

    /// Delete the given actions; the rest keep their relative order.
    /// Unknown ids are ignored.
    pub fn remove(&self, ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM pending_actions WHERE id = ?1", [id])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Count of pending actions, for "N changes pending" indicators.
    pub fn size(&self) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM pending_actions",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::Habit;

    fn delete_kind(habit_id: &str) -> ActionKind {
        ActionKind::DeleteHabit {
            habit_id: habit_id.to_string(),
        }
    }

    #[test]
    fn enqueued_at_is_strictly_increasing() {
        let log = ActionLog::open_in_memory().unwrap();
        let a = log.enqueue(delete_kind("h1")).unwrap();
        let b = log.enqueue(delete_kind("h2")).unwrap();
        let c = log.enqueue(delete_kind("h3")).unwrap();
        assert!(a.enqueued_at < b.enqueued_at);
        assert!(b.enqueued_at < c.enqueued_at);
    }

    #[test]
    fn peek_round_trips_typed_payloads() {
        let log = ActionLog::open_in_memory().unwrap();
        let habit = Habit::new("u1", "Run");
        log.enqueue(ActionKind::CreateHabit(habit.clone())).unwrap();

        let pending = log.peek_all().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, ActionKind::CreateHabit(habit));
    }

    #[test]
    fn remove_unknown_id_is_a_noop() {
        let log = ActionLog::open_in_memory().unwrap();
        log.enqueue(delete_kind("h1")).unwrap();
        log.remove(&["no-such-id".to_string()]).unwrap();
        assert_eq!(log.size().unwrap(), 1);
    }
}
