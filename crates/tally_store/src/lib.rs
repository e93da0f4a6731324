//! SQLite persistence for Tally
//!
//! Two independent single-file stores: [`LocalStore`] owns the canonical
//! habit state the UI reads, and [`ActionLog`] owns the durable queue of
//! not-yet-synced mutations. The log is a disposable secondary ledger;
//! losing it loses only unsynced work, never the local source of truth.

pub mod action_log;
pub mod local;

pub use action_log::ActionLog;
pub use local::{LocalStore, UserStats};
