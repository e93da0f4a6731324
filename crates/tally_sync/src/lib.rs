//! # Tally Sync Engine
//!
//! Offline-queue synchronization for the Tally habit tracker.
//!
//! ## Architecture
//!
//! - **Local Store**: canonical habit state, mutated optimistically
//! - **Action Log**: durable FIFO queue of not-yet-synced mutations
//! - **Connectivity Oracle**: online/offline signal with coalesced transitions
//! - **Sync Engine**: drains the log in order against the remote REST API
//! - **Habit Service**: the context object wiring the pieces together
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_config::SyncConfig;
//! use tally_store::{ActionLog, LocalStore};
//! use tally_sync::{ConnectivityOracle, HabitService, HttpRemoteApi};
//!
//! #[tokio::main]
//! async fn main() -> tally_common::Result<()> {
//!     let config = SyncConfig {
//!         user_id: "user-123".to_string(),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let store = Arc::new(LocalStore::open(&config.db_path)?);
//!     let log = Arc::new(ActionLog::open(&config.queue_path)?);
//!     let connectivity = Arc::new(ConnectivityOracle::new(true));
//!     let remote = HttpRemoteApi::new(&config.api_base_url, config.request_timeout())?;
//!
//!     let service = HabitService::new(&config, store, log, connectivity, remote);
//!     let _loop = service.start();
//!     Ok(())
//! }
//! ```

pub mod connectivity;
pub mod engine;
pub mod remote;
pub mod service;

pub use connectivity::ConnectivityOracle;
pub use engine::{BackoffPolicy, DrainOutcome, SyncEngine, SyncState};
pub use remote::{HttpRemoteApi, RemoteApi};
pub use service::HabitService;
