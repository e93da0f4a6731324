//! Habit service: the explicit context object wiring the sync core together.
//!
//! Replaces the ambient-singleton manager pattern: every collaborator (local
//! store, action log, connectivity oracle, remote client) is passed in and
//! held by value. Mutations apply to the local store exactly once, are
//! enqueued in the action log, and a drain is triggered; when online the
//! drain sends them immediately, preserving order with any backlog.

use crate::connectivity::ConnectivityOracle;
use crate::engine::{BackoffPolicy, DrainOutcome, SyncEngine, SyncState};
use crate::remote::RemoteApi;
use std::sync::Arc;
use std::time::Duration;
use tally_common::{now_ms, start_of_day, ActionKind, Habit, Result, SyncError};
use tally_config::SyncConfig;
use tally_store::{ActionLog, LocalStore, UserStats};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

pub struct HabitService<R: RemoteApi + 'static> {
    store: Arc<LocalStore>,
    log: Arc<ActionLog>,
    engine: Arc<SyncEngine<R>>,
    user_id: String,
    sync_interval: Duration,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl<R: RemoteApi + 'static> HabitService<R> {
    pub fn new(
        config: &SyncConfig,
        store: Arc<LocalStore>,
        log: Arc<ActionLog>,
        connectivity: Arc<ConnectivityOracle>,
        remote: R,
    ) -> Self {
        let backoff = BackoffPolicy {
            base: Duration::from_secs(config.backoff_base_secs),
            cap: Duration::from_secs(config.backoff_cap_secs),
        };
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&log),
            connectivity,
            remote,
            config.user_id.clone(),
            backoff,
        ));
        // Capacity 1: a second trigger while one is queued coalesces away.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            store,
            log,
            engine,
            user_id: config.user_id.clone(),
            sync_interval: config.sync_interval(),
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
        }
    }

    /// Spawn the background sync loop. Call once; later calls return a
    /// handle to a task that exits immediately.
    pub fn start(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let interval = self.sync_interval;
        let receiver = self
            .trigger_rx
            .try_lock()
            .ok()
            .and_then(|mut slot| slot.take());
        tokio::spawn(async move {
            match receiver {
                Some(rx) => engine.run(rx, interval).await,
                None => tracing::warn!("sync loop already started"),
            }
        })
    }

    /// Create a habit: optimistic local insert, then queue for sync.
    pub fn create_habit(&self, mut habit: Habit) -> Result<Habit> {
        habit.user_id = self.user_id.clone();
        habit.validate()?;
        self.store.insert_habit(&habit)?;
        self.log.enqueue(ActionKind::CreateHabit(habit.clone()))?;
        self.request_sync();
        Ok(habit)
    }

    /// Update a habit in place; stamps `updated_at`.
    pub fn update_habit(&self, mut habit: Habit) -> Result<Habit> {
        habit.updated_at = now_ms();
        habit.validate()?;
        if self.store.get_habit(&habit.id)?.is_none() {
            return Err(SyncError::Validation(format!(
                "unknown habit: {}",
                habit.id
            )));
        }
        self.store.update_habit(&habit)?;
        self.log.enqueue(ActionKind::UpdateHabit(habit.clone()))?;
        self.request_sync();
        Ok(habit)
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        if self.store.get_habit(habit_id)?.is_none() {
            return Err(SyncError::Validation(format!("unknown habit: {habit_id}")));
        }
        self.store.delete_habit(habit_id)?;
        self.log.enqueue(ActionKind::DeleteHabit {
            habit_id: habit_id.to_string(),
        })?;
        self.request_sync();
        Ok(())
    }

    /// Mark today's completion; idempotent per calendar day.
    pub fn complete_habit(&self, habit_id: &str) -> Result<Habit> {
        let date = start_of_day(now_ms());
        let updated = self
            .store
            .complete_habit(habit_id, date)?
            .ok_or_else(|| SyncError::Validation(format!("unknown habit: {habit_id}")))?;
        self.log.enqueue(ActionKind::CompleteHabit {
            habit_id: habit_id.to_string(),
            date,
        })?;
        self.request_sync();
        Ok(updated)
    }

    /// Nudge the background loop; cheap, coalesced, never blocks.
    pub fn request_sync(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Run one drain pass now and wait for its outcome.
    pub async fn sync_now(&self) -> Result<DrainOutcome> {
        self.engine.drain().await
    }

    pub fn habits(&self) -> Result<Vec<Habit>> {
        self.store.list_habits(&self.user_id)
    }

    pub fn get_habit(&self, habit_id: &str) -> Result<Option<Habit>> {
        self.store.get_habit(habit_id)
    }

    pub fn stats(&self) -> Result<UserStats> {
        self.store.user_stats(&self.user_id)
    }

    pub fn completed_today(&self) -> Result<usize> {
        self.store.completed_count_for_date(now_ms())
    }

    /// "N changes pending" indicator for the UI.
    pub fn pending_count(&self) -> Result<usize> {
        self.engine.pending_count()
    }

    pub fn last_sync_error(&self) -> Option<String> {
        self.engine.last_error()
    }

    pub fn sync_state(&self) -> SyncState {
        self.engine.state()
    }

    /// Graceful shutdown: a running drain stops at the next action boundary.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}
