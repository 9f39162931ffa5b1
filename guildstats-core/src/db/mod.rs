//! Database layer for guildstats
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for metrics queries and snapshot persistence

pub mod repo;
pub mod schema;

pub use repo::Database;
