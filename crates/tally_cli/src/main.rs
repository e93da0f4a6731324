//! Tally CLI - offline-first habit tracking from the terminal
//!
//! Usage: tally <command> [options]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use tally_common::{Frequency, Habit};
use tally_config::SyncConfig;
use tally_store::{ActionLog, LocalStore};
use tally_sync::{ConnectivityOracle, DrainOutcome, HabitService, HttpRemoteApi};

#[derive(Parser)]
#[command(name = "tally", version = "0.1.0", about = "Offline-first habit tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(long, global = true, default_value = "tally.toml")]
    config: String,

    /// Run without attempting any network calls
    #[arg(long, global = true)]
    offline: bool,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new habit
    Add {
        title: String,

        #[arg(long, default_value = "")]
        category: String,

        /// Daily, Weekly, or Custom
        #[arg(long, default_value = "Daily")]
        frequency: String,

        /// Weekday indices for Custom frequency, e.g. "1,3,5"
        #[arg(long, default_value = "")]
        days: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List habits, newest first
    List,

    /// Mark a habit completed for today
    Done { habit_id: String },

    /// Delete a habit
    Rm { habit_id: String },

    /// Drain the pending queue against the backend
    Sync,

    /// Show pending changes and sync health
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tally_common::telemetry::init_tracing(cli.verbose, false);

    let config = load_config(&cli.config)?;
    let store = Arc::new(LocalStore::open(&config.db_path).context("opening local store")?);
    let log = Arc::new(ActionLog::open(&config.queue_path).context("opening action log")?);
    let connectivity = Arc::new(ConnectivityOracle::new(!cli.offline));
    let remote = HttpRemoteApi::new(&config.api_base_url, config.request_timeout())?;
    let service = HabitService::new(&config, store, log, connectivity, remote);

    match cli.command {
        Commands::Add {
            title,
            category,
            frequency,
            days,
            notes,
        } => {
            let mut habit = Habit::new(&config.user_id, title);
            habit.category = category;
            habit.frequency = Frequency::from_str(&frequency)?;
            habit.selected_days = days;
            habit.notes = notes;
            let habit = service.create_habit(habit)?;
            println!("added {} ({})", habit.title, habit.id);
            try_sync(&service, cli.offline).await;
        }
        Commands::List => {
            for habit in service.habits()? {
                println!(
                    "{}  {}  streak {}  [{}]",
                    habit.id, habit.title, habit.streak_count, habit.frequency
                );
            }
        }
        Commands::Done { habit_id } => {
            let habit = service.complete_habit(&habit_id)?;
            println!("completed {} (streak {})", habit.title, habit.streak_count);
            try_sync(&service, cli.offline).await;
        }
        Commands::Rm { habit_id } => {
            service.delete_habit(&habit_id)?;
            println!("deleted {habit_id}");
            try_sync(&service, cli.offline).await;
        }
        Commands::Sync => match service.sync_now().await? {
            DrainOutcome::Completed { synced, discarded } => {
                println!("synced {synced} change(s), discarded {discarded}");
            }
            DrainOutcome::Halted {
                synced, remaining, ..
            } => {
                println!("synced {synced}, {remaining} pending (will retry later)");
            }
            DrainOutcome::Interrupted {
                synced, remaining, ..
            } => {
                println!("sync interrupted: {synced} done, {remaining} pending");
            }
            DrainOutcome::Offline => println!("offline, changes kept locally"),
            DrainOutcome::AlreadyRunning => println!("sync already in progress"),
        },
        Commands::Status => {
            let stats = service.stats()?;
            println!(
                "{} habit(s), total streaks {}",
                stats.habit_count, stats.total_streaks
            );
            println!("{} change(s) pending", service.pending_count()?);
            if let Some(error) = service.last_sync_error() {
                println!("last sync error: {error}");
            }
        }
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<SyncConfig> {
    let config = if std::path::Path::new(path).exists() {
        SyncConfig::from_toml(path).with_context(|| format!("loading config from {path}"))?
    } else {
        tracing::debug!(path, "no config file, using defaults");
        SyncConfig {
            user_id: "local".to_string(),
            ..Default::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Best-effort immediate sync after a mutation; failures stay queued.
async fn try_sync<R: tally_sync::RemoteApi + 'static>(service: &HabitService<R>, offline: bool) {
    if offline {
        return;
    }
    match service.sync_now().await {
        Ok(DrainOutcome::Halted { remaining, .. }) => {
            eprintln!("{remaining} change(s) will sync later");
        }
        Ok(_) => {}
        Err(err) => eprintln!("sync failed: {err}"),
    }
}
