//! Backfill driver
//!
//! Recomputes snapshots for an explicit list of historical days: any
//! existing snapshots in `[first, last]` are deleted, then one snapshot is
//! assembled and inserted per day, in the order given.
//!
//! Prior cumulative state for each day comes from the store via
//! `most_recent_before_or_at(day)`, so the resulting delta chain is only
//! consistent when the days are supplied in chronological order. Operators
//! are expected to do so; the day order is deliberately not rewritten here.

use super::{assemble, SnapshotOptions};
use crate::error::{Error, Result};
use crate::store::{MetricsQuery, SnapshotStore};
use crate::types::Snapshot;
use chrono::{DateTime, Utc};

/// Recompute snapshots for `days`, replacing any existing records in the
/// spanned range.
///
/// An empty list is rejected before anything is deleted: the range delete
/// has no meaningful bounds without at least one day.
pub fn backfill<S>(
    store: &S,
    days: &[DateTime<Utc>],
    opts: &SnapshotOptions,
) -> Result<Vec<Snapshot>>
where
    S: MetricsQuery + SnapshotStore + ?Sized,
{
    let (first, last) = match (days.first(), days.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::EmptyBackfill),
    };

    let removed = store.delete_range(first, last)?;
    tracing::info!(
        start = %first,
        end = %last,
        removed,
        "Cleared existing snapshots in backfill range"
    );

    let mut snapshots = Vec::with_capacity(days.len());
    for day in days {
        let snapshot = assemble(store, *day, opts)?;
        store.insert(&snapshot)?;
        tracing::info!(day = %day, "Backfilled snapshot");
        snapshots.push(snapshot);
    }

    Ok(snapshots)
}
