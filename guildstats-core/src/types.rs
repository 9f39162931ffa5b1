//! Domain types for daily usage snapshots
//!
//! The [`Snapshot`] struct (and its serde field names) is the persisted-state
//! contract: dashboards and reports read the JSON documents written by the
//! snapshot store, so renaming a field here is a breaking change.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Delta metric** | "how much changed since the last snapshot": today's cumulative reading minus the previous snapshot's |
//! | **Window count** | events within a trailing 1/7/30-day span ending at the reference instant; spans overlap |
//! | **to_date** | all-time total as of the reference instant, carried forward to enable the next delta |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overlapping trailing-window counts for an activity metric.
///
/// Each window is computed independently against the same reference instant,
/// so `day <= week <= month` always holds; they are not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounts {
    /// Events in the trailing 1 day
    pub day: i64,
    /// Events in the trailing 7 days
    pub week: i64,
    /// Events in the trailing 30 days
    pub month: i64,
}

/// Window counts plus an all-time total for one alias/snippet call category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    /// Calls in the trailing 1 day
    pub day: i64,
    /// Calls in the trailing 7 days
    pub week: i64,
    /// Calls in the trailing 30 days
    pub month: i64,
    /// Calls ever, up to and including the reference instant
    pub to_date: i64,
}

/// Cumulative totals of every delta-style metric at a snapshot's instant.
///
/// This is the state threaded into the next snapshot's delta computation.
/// A missing prior snapshot is represented by `ToDateTotals::default()`
/// (all zeros), which makes the bootstrap case `delta == cumulative`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDateTotals {
    /// Lifetime commands invoked
    #[serde(default)]
    pub num_commands: i64,

    /// Character records stored (approximate)
    #[serde(default)]
    pub num_characters: i64,

    /// Lifetime invocations per command, only present when the
    /// per-command breakdown calculator is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_activity: Option<BTreeMap<String, i64>>,
}

/// One persisted daily report.
///
/// Created exactly once by the snapshot assembler, immutable thereafter, and
/// only removed by the backfill driver (delete-then-reinsert, never updated
/// in place).
///
/// Invariant: for temporally adjacent snapshots,
/// `num_commands == to_date.num_commands - previous.to_date.num_commands`
/// (and symmetrically for every delta metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Instant this snapshot represents; snapshots are logically ordered by
    /// this field and the store retrieves them in descending order on it
    pub timestamp: DateTime<Utc>,

    /// Commands invoked since the previous snapshot (may be negative if the
    /// lifetime counter was reset or corrected upstream)
    pub num_commands: i64,
    /// Characters imported since the previous snapshot
    pub num_characters: i64,

    /// Distinct users active in the trailing day/week/month
    pub num_active_users: WindowCounts,
    /// Distinct guilds active in the trailing day/week/month
    pub num_active_guilds: WindowCounts,

    /// Personal alias calls
    pub num_alias_calls: CallStats,
    /// Server alias calls
    pub num_servalias_calls: CallStats,
    /// Personal snippet calls
    pub num_snippet_calls: CallStats,
    /// Server snippet calls
    pub num_servsnippet_calls: CallStats,
    /// Workshop alias calls
    pub num_workshop_alias_calls: CallStats,
    /// Workshop server alias calls
    pub num_workshop_servalias_calls: CallStats,
    /// Workshop snippet calls
    pub num_workshop_snippet_calls: CallStats,
    /// Workshop server snippet calls
    pub num_workshop_servsnippet_calls: CallStats,

    /// Per-command invocation deltas, only present when the breakdown
    /// calculator is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_activity: Option<BTreeMap<String, i64>>,

    /// Cumulative totals carried forward for the next snapshot's deltas
    pub to_date: ToDateTotals,
}
