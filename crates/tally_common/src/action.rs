//! Queued offline actions.
//!
//! An [`Action`] is a recorded intent to mutate remote state, captured at the
//! moment of a user operation and destroyed only once the corresponding
//! remote call is confirmed. Actions are immutable; identity is the `id`
//! token, never the queue position.

use crate::model::Habit;
use serde::{Deserialize, Serialize};

/// Generate a short random id token (lowercase alphanumeric).
pub fn new_token() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(12)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// The four mutating operations, each with a statically-typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all_fields = "camelCase")]
pub enum ActionKind {
    /// Carries the full habit including its client-generated id, so a
    /// re-send after a lost ack cannot create a duplicate remote record.
    CreateHabit(Habit),
    UpdateHabit(Habit),
    DeleteHabit { habit_id: String },
    CompleteHabit { habit_id: String, date: i64 },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::CreateHabit(_) => "CreateHabit",
            ActionKind::UpdateHabit(_) => "UpdateHabit",
            ActionKind::DeleteHabit { .. } => "DeleteHabit",
            ActionKind::CompleteHabit { .. } => "CompleteHabit",
        }
    }

    /// The habit this action targets.
    pub fn habit_id(&self) -> &str {
        match self {
            ActionKind::CreateHabit(habit) | ActionKind::UpdateHabit(habit) => &habit.id,
            ActionKind::DeleteHabit { habit_id } => habit_id,
            ActionKind::CompleteHabit { habit_id, .. } => habit_id,
        }
    }
}

/// One durable record in the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Stamped by the log at enqueue time; strictly increasing.
    pub enqueued_at: i64,
}
