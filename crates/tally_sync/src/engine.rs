//! Sync engine: drains the action log against the remote API.
//!
//! State machine: `Idle` → `Draining` on a manual request, an online
//! transition, or a periodic tick with pending work; `Draining` → `Backoff`
//! on a transient failure; `Backoff` → `Idle` after a delay or the next
//! explicit trigger, and leaving `Backoff` re-runs the drain from the
//! current log state. At most one drain runs at a time; a second trigger
//! while draining is a no-op.

use crate::connectivity::ConnectivityOracle;
use crate::remote::RemoteApi;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tally_common::{Action, ActionKind, Result};
use tally_store::ActionLog;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Draining,
    Backoff,
}

/// Result of one drain pass over a snapshot of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Snapshot exhausted; `synced` actions confirmed remotely and
    /// `discarded` permanently-rejected actions dropped.
    Completed { synced: usize, discarded: usize },
    /// A transient failure halted the pass; the failed action and
    /// everything after it remain queued.
    Halted {
        synced: usize,
        discarded: usize,
        remaining: usize,
    },
    /// Shutdown stopped the pass at an action boundary; the failed-state
    /// counters and last error are left untouched.
    Interrupted {
        synced: usize,
        discarded: usize,
        remaining: usize,
    },
    /// Another drain holds the lock; this trigger coalesced away.
    AlreadyRunning,
    /// The oracle reports offline; nothing attempted.
    Offline,
}

/// Exponential backoff after transient failures.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(300),
        }
    }
}

pub struct SyncEngine<R: RemoteApi> {
    log: Arc<ActionLog>,
    connectivity: Arc<ConnectivityOracle>,
    remote: R,
    user_id: String,
    backoff: BackoffPolicy,
    drain_lock: Mutex<()>,
    consecutive_failures: AtomicU32,
    state_tx: watch::Sender<SyncState>,
    error_tx: watch::Sender<Option<String>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<R: RemoteApi> SyncEngine<R> {
    pub fn new(
        log: Arc<ActionLog>,
        connectivity: Arc<ConnectivityOracle>,
        remote: R,
        user_id: impl Into<String>,
        backoff: BackoffPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(SyncState::Idle);
        let (error_tx, _) = watch::channel(None);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            log,
            connectivity,
            remote,
            user_id: user_id.into(),
            backoff,
            drain_lock: Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
            state_tx,
            error_tx,
            shutdown_tx,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// Last sync failure for display, cleared by the next clean drain.
    pub fn last_error(&self) -> Option<String> {
        self.error_tx.borrow().clone()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error_tx.subscribe()
    }

    /// Actions still waiting to reach the remote.
    pub fn pending_count(&self) -> Result<usize> {
        self.log.size()
    }

    /// Request graceful shutdown; a running drain stops at the next
    /// action boundary, never mid-call.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// One drain pass over a consistent snapshot of the log.
    ///
    /// Actions are processed strictly in enqueue order, one remote call at
    /// a time. Successes are pruned immediately, so progress survives a
    /// crash mid-pass. Actions enqueued while the pass runs wait for the
    /// next one.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("drain already in progress, coalescing trigger");
            return Ok(DrainOutcome::AlreadyRunning);
        };
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping drain");
            return Ok(DrainOutcome::Offline);
        }

        let result = self.drain_batch().await;
        if result.is_err() {
            // A log persistence failure aborts the pass; don't stay
            // stuck in Draining.
            self.state_tx.send_replace(SyncState::Idle);
        }
        result
    }

    async fn drain_batch(&self) -> Result<DrainOutcome> {
        let batch = self.log.peek_all()?;
        if batch.is_empty() {
            self.error_tx.send_replace(None);
            return Ok(DrainOutcome::Completed {
                synced: 0,
                discarded: 0,
            });
        }

        self.state_tx.send_replace(SyncState::Draining);
        tracing::info!(pending = batch.len(), "draining offline action log");

        let shutdown_rx = self.shutdown_tx.subscribe();
        let mut synced = 0;
        let mut discarded = 0;

        for (index, action) in batch.iter().enumerate() {
            if *shutdown_rx.borrow() {
                let remaining = batch.len() - index;
                tracing::info!(synced, remaining, "drain interrupted by shutdown");
                self.state_tx.send_replace(SyncState::Idle);
                return Ok(DrainOutcome::Interrupted {
                    synced,
                    discarded,
                    remaining,
                });
            }

            match self.execute(action).await {
                Ok(()) => {
                    self.log.remove(std::slice::from_ref(&action.id))?;
                    synced += 1;
                }
                Err(err) if err.is_transient() => {
                    self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                    self.error_tx.send_replace(Some(err.to_string()));
                    self.state_tx.send_replace(SyncState::Backoff);
                    tracing::warn!(
                        kind = action.kind.name(),
                        id = %action.id,
                        error = %err,
                        "transient failure, halting drain"
                    );
                    return Ok(DrainOutcome::Halted {
                        synced,
                        discarded,
                        remaining: batch.len() - index,
                    });
                }
                Err(err) => {
                    // A permanently-rejected action can never succeed and
                    // must not block the queue.
                    tracing::warn!(
                        kind = action.kind.name(),
                        id = %action.id,
                        error = %err,
                        "permanently rejected action discarded"
                    );
                    self.log.remove(std::slice::from_ref(&action.id))?;
                    discarded += 1;
                }
            }
        }

        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.error_tx.send_replace(None);
        self.state_tx.send_replace(SyncState::Idle);
        tracing::info!(synced, discarded, "drain pass complete");
        Ok(DrainOutcome::Completed { synced, discarded })
    }

    async fn execute(&self, action: &Action) -> Result<()> {
        match &action.kind {
            ActionKind::CreateHabit(habit) => {
                self.remote.create_habit(&self.user_id, habit).await
            }
            ActionKind::UpdateHabit(habit) => {
                self.remote.update_habit(&self.user_id, habit).await
            }
            ActionKind::DeleteHabit { habit_id } => {
                self.remote.delete_habit(&self.user_id, habit_id).await
            }
            ActionKind::CompleteHabit { habit_id, date } => {
                self.remote
                    .complete_habit(&self.user_id, habit_id, *date)
                    .await
            }
        }
    }

    fn backoff_delay(&self) -> Duration {
        let failures = self.consecutive_failures.load(Ordering::Relaxed);
        let exponent = failures.saturating_sub(1).min(16);
        self.backoff
            .base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff.cap)
    }

    /// Event loop: drains on online transitions, explicit triggers, and
    /// periodic ticks while online with pending work. Runs until shutdown.
    pub async fn run(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<()>, interval: Duration) {
        let mut online_rx = self.connectivity.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("sync loop shutting down");
                        return;
                    }
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *online_rx.borrow() {
                        self.drain_and_backoff(&mut trigger_rx, &mut shutdown_rx).await;
                    }
                }
                triggered = trigger_rx.recv() => {
                    if triggered.is_none() {
                        return;
                    }
                    self.drain_and_backoff(&mut trigger_rx, &mut shutdown_rx).await;
                }
                _ = ticker.tick() => {
                    if !self.connectivity.is_online() {
                        continue;
                    }
                    match self.log.size() {
                        Ok(0) => {}
                        Ok(_) => self.drain_and_backoff(&mut trigger_rx, &mut shutdown_rx).await,
                        Err(err) => {
                            tracing::error!(error = %err, "failed to read pending queue size");
                        }
                    }
                }
            }
        }
    }

    /// Run a drain; on a transient halt, wait out the backoff delay (an
    /// explicit trigger cuts it short, shutdown aborts it) and then retry
    /// from the current log state.
    async fn drain_and_backoff(
        &self,
        trigger_rx: &mut mpsc::Receiver<()>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        loop {
            match self.drain().await {
                Ok(DrainOutcome::Halted { remaining, .. }) => {
                    let delay = self.backoff_delay();
                    tracing::info!(?delay, remaining, "entering backoff before retry");
                    let retry = tokio::select! {
                        _ = tokio::time::sleep(delay) => true,
                        triggered = trigger_rx.recv() => triggered.is_some(),
                        _ = shutdown_rx.changed() => false,
                    };
                    self.state_tx.send_replace(SyncState::Idle);
                    if !retry || *shutdown_rx.borrow() {
                        return;
                    }
                }
                Ok(_) => return,
                Err(err) => {
                    tracing::error!(error = %err, "drain failed");
                    self.error_tx.send_replace(Some(err.to_string()));
                    self.state_tx.send_replace(SyncState::Idle);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::Habit;

    struct NullRemote;

    impl RemoteApi for NullRemote {
        async fn create_habit(&self, _user_id: &str, _habit: &Habit) -> Result<()> {
            Ok(())
        }
        async fn update_habit(&self, _user_id: &str, _habit: &Habit) -> Result<()> {
            Ok(())
        }
        async fn delete_habit(&self, _user_id: &str, _habit_id: &str) -> Result<()> {
            Ok(())
        }
        async fn complete_habit(&self, _user_id: &str, _habit_id: &str, _date: i64) -> Result<()> {
            Ok(())
        }
    }

    fn engine(backoff: BackoffPolicy) -> SyncEngine<NullRemote> {
        SyncEngine::new(
            Arc::new(ActionLog::open_in_memory().unwrap()),
            Arc::new(ConnectivityOracle::new(true)),
            NullRemote,
            "u1",
            backoff,
        )
    }

    #[test]
    fn backoff_delay_grows_and_caps() {
        let engine = engine(BackoffPolicy {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(10),
        });

        let delay_after = |failures: u32| {
            engine.consecutive_failures.store(failures, Ordering::Relaxed);
            engine.backoff_delay()
        };
        assert_eq!(delay_after(1), Duration::from_secs(2));
        assert_eq!(delay_after(2), Duration::from_secs(4));
        assert_eq!(delay_after(3), Duration::from_secs(8));
        assert_eq!(delay_after(4), Duration::from_secs(10));
        assert_eq!(delay_after(30), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn empty_log_drain_is_a_noop() {
        let engine = engine(BackoffPolicy::default());
        let outcome = engine.drain().await.unwrap();
        assert_eq!(
            outcome,
            DrainOutcome::Completed {
                synced: 0,
                discarded: 0
            }
        );
        assert_eq!(engine.state(), SyncState::Idle);
    }
}
