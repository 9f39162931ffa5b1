//! Store capability traits
//!
//! The snapshot algorithms never touch the database directly; they consume
//! two narrow capabilities, passed in explicitly as a handle (never ambient
//! global state):
//!
//! - [`MetricsQuery`]: read-only counts and counter lookups over the
//!   application's metrics collections
//! - [`SnapshotStore`]: persistence of the daily snapshot documents
//!
//! [`crate::db::Database`] implements both against SQLite; tests substitute
//! fakes.

use crate::error::Result;
use crate::types::Snapshot;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Counter key for the lifetime number of commands ever invoked.
pub const LIFETIME_COMMANDS_KEY: &str = "commands_used_life";

/// Event collections the window counter can run against.
///
/// The counting logic is identical across collections; the only variation is
/// the table and the name of the ordering timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCollection {
    /// Per-user last-activity records
    UserActivity,
    /// Per-guild last-activity records
    GuildActivity,
    /// One row per alias/snippet invocation
    AliasEvents,
}

impl EventCollection {
    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            EventCollection::UserActivity => "user_activity",
            EventCollection::GuildActivity => "guild_activity",
            EventCollection::AliasEvents => "alias_events",
        }
    }

    /// Column holding the ordering timestamp for window filters.
    pub fn timestamp_column(&self) -> &'static str {
        match self {
            EventCollection::UserActivity | EventCollection::GuildActivity => "last_command_time",
            EventCollection::AliasEvents => "timestamp",
        }
    }
}

/// The eight alias/snippet call categories tracked per snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasEventKind {
    Alias,
    Servalias,
    Snippet,
    Servsnippet,
    WorkshopAlias,
    WorkshopServalias,
    WorkshopSnippet,
    WorkshopServsnippet,
}

impl AliasEventKind {
    /// All categories, in the order they appear in the snapshot document.
    pub const ALL: [AliasEventKind; 8] = [
        AliasEventKind::Alias,
        AliasEventKind::Servalias,
        AliasEventKind::Snippet,
        AliasEventKind::Servsnippet,
        AliasEventKind::WorkshopAlias,
        AliasEventKind::WorkshopServalias,
        AliasEventKind::WorkshopSnippet,
        AliasEventKind::WorkshopServsnippet,
    ];

    /// Stored event-type label.
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasEventKind::Alias => "alias",
            AliasEventKind::Servalias => "servalias",
            AliasEventKind::Snippet => "snippet",
            AliasEventKind::Servsnippet => "servsnippet",
            AliasEventKind::WorkshopAlias => "workshop_alias",
            AliasEventKind::WorkshopServalias => "workshop_servalias",
            AliasEventKind::WorkshopSnippet => "workshop_snippet",
            AliasEventKind::WorkshopServsnippet => "workshop_servsnippet",
        }
    }
}

/// Match filter for [`MetricsQuery::count`].
///
/// Timestamp bounds form a left-open, right-closed interval: an event
/// matches when `after < t <= through`. Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    /// Restrict to one alias/snippet category (alias events only)
    pub kind: Option<AliasEventKind>,
    /// Exclusive lower bound on the ordering timestamp
    pub after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the ordering timestamp
    pub through: Option<DateTime<Utc>>,
}

/// Read-only metrics queries consumed by the calculators.
pub trait MetricsQuery {
    /// Count events in `collection` matching `filter`.
    fn count(&self, collection: EventCollection, filter: &EventFilter) -> Result<i64>;

    /// Look up a lifetime counter by key. Absence is not an error; callers
    /// treat `None` as zero.
    fn counter_value(&self, key: &str) -> Result<Option<i64>>;

    /// Approximate count of stored character records.
    ///
    /// This is a fast estimate rather than an exact count; the
    /// accuracy/performance trade-off is part of the design.
    fn estimated_character_count(&self) -> Result<i64>;

    /// Lifetime invocation counts per command name.
    fn command_invocations(&self) -> Result<BTreeMap<String, i64>>;
}

/// Persistence of daily snapshot documents, in timestamp order.
pub trait SnapshotStore {
    /// Persist one snapshot.
    fn insert(&self, snapshot: &Snapshot) -> Result<()>;

    /// The most recent snapshot whose timestamp is at or before `instant`,
    /// if any exists.
    fn most_recent_before_or_at(&self, instant: DateTime<Utc>) -> Result<Option<Snapshot>>;

    /// Delete every snapshot with `start <= timestamp <= end`, returning the
    /// number removed.
    fn delete_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64>;
}
