//! Common types and errors for Tally
//!
//! This crate provides the shared data model (habits, completions, queued
//! actions) and the error taxonomy used across all Tally components.

pub mod action;
pub mod model;
pub mod telemetry;

pub use action::{new_token, Action, ActionKind};
pub use model::{now_ms, start_of_day, Frequency, Habit, HabitInstance};

use thiserror::Error;

/// Common result type for Tally operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error taxonomy for the sync core.
///
/// `Transient` means retry later with the queue intact. `Permanent` means the
/// offending action can never succeed and is discarded. `Persistence` is
/// fatal to the triggering call and always propagated, never swallowed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("transient sync failure: {reason}")]
    Transient { reason: String },

    #[error("permanent sync rejection: {reason}")]
    Permanent { reason: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn transient(reason: impl Into<String>) -> Self {
        SyncError::Transient {
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        SyncError::Permanent {
            reason: reason.into(),
        }
    }

    /// True for failures the sync engine should retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }

    /// True for rejections that can never succeed on retry.
    pub fn is_permanent(&self) -> bool {
        matches!(self, SyncError::Permanent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        assert!(SyncError::transient("timeout").is_transient());
        assert!(!SyncError::transient("timeout").is_permanent());
        assert!(SyncError::permanent("404").is_permanent());
        assert!(!SyncError::Validation("bad title".into()).is_transient());
    }
}
