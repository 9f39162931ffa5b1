//! Error types for guildstats-core

use thiserror::Error;

/// Main error type for the guildstats-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot document (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backfill was invoked with no days to recompute.
    ///
    /// The range delete that precedes recomputation is undefined for an
    /// empty day list, so this is rejected before anything is touched.
    #[error("backfill requires at least one day")]
    EmptyBackfill,
}

/// Result type alias for guildstats-core
pub type Result<T> = std::result::Result<T, Error>;
