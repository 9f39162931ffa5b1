//! guildstats-daily - compute and persist today's usage snapshot
//!
//! This is the scheduled-trigger entry point: an external scheduler (cron,
//! systemd timer) runs it once a day with no payload. `--at` exists for
//! manual runs against a historical instant.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use guildstats_core::snapshot::{self, SnapshotOptions};
use guildstats_core::{Config, Database};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guildstats-daily")]
#[command(about = "Compute and persist today's usage snapshot")]
#[command(version)]
struct Args {
    /// Reference instant (RFC 3339) instead of the current time
    #[arg(long)]
    at: Option<String>,

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

    tracing::info!("guildstats-daily starting");

    let at = args
        .at
        .as_deref()
        .map(|s| DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc)))
        .transpose()
        .context("invalid --at instant, expected RFC 3339")?;

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

    let snapshot =
        snapshot::compute_daily(&db, &opts, at).context("failed to compute daily snapshot")?;

    println!("Snapshot for {}", snapshot.timestamp.to_rfc3339());
    println!("  commands today:      {}", snapshot.num_commands);
    println!("  characters today:    {}", snapshot.num_characters);
    println!(
        "  active users:        day {} / week {} / month {}",
        snapshot.num_active_users.day,
        snapshot.num_active_users.week,
        snapshot.num_active_users.month
    );
    println!(
        "  active guilds:       day {} / week {} / month {}",
        snapshot.num_active_guilds.day,
        snapshot.num_active_guilds.week,
        snapshot.num_active_guilds.month
    );
    println!(
        "  alias calls today:   {} (lifetime {})",
        snapshot.num_alias_calls.day, snapshot.num_alias_calls.to_date
    );
    println!(
        "  snippet calls today: {} (lifetime {})",
        snapshot.num_snippet_calls.day, snapshot.num_snippet_calls.to_date
    );

    tracing::info!("guildstats-daily done");
    Ok(())
}
