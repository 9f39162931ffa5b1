//! guildstats-backfill - recompute snapshots for historical days
//!
//! Operator tool: takes an explicit list of days, deletes any snapshots in
//! the spanned range, and recomputes one snapshot per day in the order
//! given. Supply the days in chronological order; each day's deltas are
//! computed against the most recent snapshot at or before it, so an
//! out-of-order list produces an inconsistent delta chain.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use guildstats_core::snapshot::{self, SnapshotOptions};
use guildstats_core::{Config, Database};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guildstats-backfill")]
#[command(about = "Recompute daily snapshots for the given days")]
#[command(version)]
struct Args {
    /// Days to recompute (YYYY-MM-DD, midnight UTC), in chronological order
    #[arg(required = true)]
    days: Vec<NaiveDate>,

    /// Database path (overrides config and the default location)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Include the per-command invocation breakdown
    #[arg(long)]
    command_activity: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        guildstats_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(days = args.days.len(), "guildstats-backfill starting");

    // Open database
    let db_path = args
        .db
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(Config::database_path);
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let opts = SnapshotOptions {
        command_activity: args.command_activity || config.snapshot.command_activity,
    };

    let days: Vec<_> = args
        .days
        .iter()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .collect();

    let snapshots =
        snapshot::backfill(&db, &days, &opts).context("failed to backfill snapshots")?;

    for snapshot in &snapshots {
        println!(
            "{}: {} commands, {} characters, {} active users (day)",
            snapshot.timestamp.date_naive(),
            snapshot.num_commands,
            snapshot.num_characters,
            snapshot.num_active_users.day
        );
    }
    println!("Recomputed {} snapshot(s)", snapshots.len());

    tracing::info!("guildstats-backfill done");
    Ok(())
}
