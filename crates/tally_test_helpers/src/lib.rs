//! Test helpers for Tally crates
//!
//! Fixtures for temp-dir backed stores and a scripted in-memory remote for
//! exercising the sync engine without a network.

pub mod fixtures;
pub mod remote;

pub use fixtures::{open_temp_stores, sample_habit, temp_dir};
pub use remote::{RemoteOutcome, ScriptedRemote};
