//! Scripted in-memory remote for sync engine tests.
//!
//! Records every call in order and pops one scripted outcome per call; an
//! empty script means every call succeeds.

use std::collections::VecDeque;
use std::sync::Mutex;
use tally_common::{Habit, Result, SyncError};
use tally_sync::RemoteApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Success,
    /// Network/timeout/5xx-style failure: retryable.
    Transient,
    /// 4xx-style rejection: never retryable.
    Permanent,
}

#[derive(Default)]
pub struct ScriptedRemote {
    script: Mutex<VecDeque<RemoteOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    /// Remote where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote that plays back the given outcomes, one per call, then
    /// succeeds for any further calls.
    pub fn with_script(outcomes: &[RemoteOutcome]) -> Self {
        Self {
            script: Mutex::new(outcomes.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls observed so far, as `"<op>:<habit_id>"` labels in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, label: String) -> Result<()> {
        self.calls.lock().expect("calls lock").push(label);
        let outcome = self.script.lock().expect("script lock").pop_front();
        match outcome {
            None | Some(RemoteOutcome::Success) => Ok(()),
            Some(RemoteOutcome::Transient) => {
                Err(SyncError::transient("scripted network failure"))
            }
            Some(RemoteOutcome::Permanent) => {
                Err(SyncError::permanent("scripted validation rejection"))
            }
        }
    }
}

impl RemoteApi for ScriptedRemote {
    async fn create_habit(&self, _user_id: &str, habit: &Habit) -> Result<()> {
        self.record(format!("create:{}", habit.id))
    }

    async fn update_habit(&self, _user_id: &str, habit: &Habit) -> Result<()> {
        self.record(format!("update:{}", habit.id))
    }

    async fn delete_habit(&self, _user_id: &str, habit_id: &str) -> Result<()> {
        self.record(format!("delete:{habit_id}"))
    }

    async fn complete_habit(&self, _user_id: &str, habit_id: &str, _date: i64) -> Result<()> {
        self.record(format!("complete:{habit_id}"))
    }
}
