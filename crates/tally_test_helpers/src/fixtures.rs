//! Store fixtures for integration tests.

use assert_fs::TempDir;
use std::sync::Arc;
use tally_common::Habit;
use tally_store::{ActionLog, LocalStore};

/// Create a temporary directory, cleaned up on drop.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("failed to create temp directory")
}

/// Open a fresh local store and action log backed by files in a temp dir.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn open_temp_stores() -> (TempDir, Arc<LocalStore>, Arc<ActionLog>) {
    let temp = temp_dir();
    let store =
        LocalStore::open(&temp.path().join("tally.db")).expect("failed to open local store");
    let log =
        ActionLog::open(&temp.path().join("queue.db")).expect("failed to open action log");
    (temp, Arc::new(store), Arc::new(log))
}

/// A valid daily habit owned by `user_id`.
pub fn sample_habit(user_id: &str, title: &str) -> Habit {
    Habit::new(user_id, title)
}
