//! # guildstats-core
//!
//! Core library for guildstats - a daily usage snapshot engine for a hosted
//! chat-bot application.
//!
//! This library provides:
//! - Domain types for daily snapshots (deltas, window counts, cumulative totals)
//! - Store capability traits and a SQLite-backed implementation
//! - Metric calculators and the snapshot assembler
//! - A backfill driver for recomputing historical days
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! One snapshot is produced per day. Delta metrics (commands used, characters
//! imported) are derived by subtracting the previous snapshot's cumulative
//! `to_date` totals from today's lifetime counters. Windowed metrics (active
//! users/guilds, alias calls) are counted fresh against trailing 1/7/30-day
//! windows ending at the reference instant. Each snapshot carries its own
//! `to_date` map forward so the next snapshot can compute its deltas.
//!
//! ## Example
//!
//! ```rust,no_run
//! use guildstats_core::snapshot::{self, SnapshotOptions};
//! use guildstats_core::{Config, Database};
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let snapshot = snapshot::compute_daily(&db, &SnapshotOptions::default(), None)
//!     .expect("failed to compute snapshot");
//! println!("{} commands today", snapshot.num_commands);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use store::{AliasEventKind, EventCollection, EventFilter, MetricsQuery, SnapshotStore};
pub use types::{CallStats, Snapshot, ToDateTotals, WindowCounts};

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod types;
