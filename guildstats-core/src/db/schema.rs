//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Timestamps are stored as RFC 3339 text; comparing them lexicographically
//! is chronologically correct because every writer goes through the repo.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- Metrics collections (written by the bot)
    -- ============================================

    CREATE TABLE IF NOT EXISTS counters (
        key              TEXT PRIMARY KEY,
        value            INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS characters (
        id               TEXT PRIMARY KEY,
        owner_id         TEXT,
        name             TEXT,
        created_at       DATETIME
    );

    CREATE TABLE IF NOT EXISTS user_activity (
        user_id           TEXT PRIMARY KEY,
        last_command_time DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS guild_activity (
        guild_id          TEXT PRIMARY KEY,
        last_command_time DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS alias_events (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        type             TEXT NOT NULL,
        timestamp        DATETIME NOT NULL,
        object_id        TEXT
    );

    CREATE TABLE IF NOT EXISTS command_activity (
        name             TEXT PRIMARY KEY,
        num_invocations  INTEGER NOT NULL DEFAULT 0
    );

    -- ============================================
    -- Snapshot store (written by this crate)
    -- ============================================

    CREATE TABLE IF NOT EXISTS daily_snapshots (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp        DATETIME NOT NULL,

        -- Full snapshot document; the JSON shape is the consumer contract
        data             JSON NOT NULL
    );

    -- Window filters and descending retrieval hit these
    CREATE INDEX IF NOT EXISTS idx_user_activity_last_command_time
        ON user_activity(last_command_time);
    CREATE INDEX IF NOT EXISTS idx_guild_activity_last_command_time
        ON guild_activity(last_command_time);
    CREATE INDEX IF NOT EXISTS idx_alias_events_type_timestamp
        ON alias_events(type, timestamp);
    CREATE INDEX IF NOT EXISTS idx_daily_snapshots_timestamp
        ON daily_snapshots(timestamp);
    "#,
];

/// Run any pending migrations on this connection
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
