//! Metric calculators
//!
//! Each calculator is an independent function taking the store handle plus
//! whatever prior state it needs, and returning either a
//! `(delta, cumulative)` pair or a window-count struct. The assembler runs
//! all of them against one reference instant.

use super::window::count_in_window;
use crate::error::Result;
use crate::store::{
    AliasEventKind, EventCollection, EventFilter, MetricsQuery, LIFETIME_COMMANDS_KEY,
};
use crate::types::{CallStats, ToDateTotals, WindowCounts};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Commands invoked since the last snapshot, as `(delta, cumulative)`.
///
/// Reads the lifetime counter (absent counter is 0, not an error) and
/// subtracts the prior snapshot's cumulative reading.
pub fn num_commands<S: MetricsQuery + ?Sized>(
    store: &S,
    last_to_date: &ToDateTotals,
) -> Result<(i64, i64)> {
    let now = store.counter_value(LIFETIME_COMMANDS_KEY)?.unwrap_or(0);
    Ok((now - last_to_date.num_commands, now))
}

/// Characters imported since the last snapshot, as `(delta, cumulative)`.
///
/// The cumulative reading is an approximate count; see
/// [`MetricsQuery::estimated_character_count`].
pub fn num_characters<S: MetricsQuery + ?Sized>(
    store: &S,
    last_to_date: &ToDateTotals,
) -> Result<(i64, i64)> {
    let now = store.estimated_character_count()?;
    Ok((now - last_to_date.num_characters, now))
}

/// Per-command invocation deltas, as `(delta map, cumulative map)`.
///
/// The keyspace is the union of commands seen today and commands in the
/// prior snapshot. A command that existed before but is absent from today's
/// aggregation keeps its previous cumulative value and reports a delta of 0;
/// it is never dropped from either map.
pub fn command_activity<S: MetricsQuery + ?Sized>(
    store: &S,
    last_to_date: &ToDateTotals,
) -> Result<(BTreeMap<String, i64>, BTreeMap<String, i64>)> {
    let empty = BTreeMap::new();
    let last = last_to_date.command_activity.as_ref().unwrap_or(&empty);

    let mut to_date = store.command_invocations()?;
    for (name, prev) in last {
        to_date.entry(name.clone()).or_insert(*prev);
    }

    let today = to_date
        .iter()
        .map(|(name, cumulative)| {
            let prev = last.get(name).copied().unwrap_or(0);
            (name.clone(), cumulative - prev)
        })
        .collect();

    Ok((today, to_date))
}

/// Distinct users active in the trailing day/week/month.
pub fn num_active_users<S: MetricsQuery + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<WindowCounts> {
    activity_windows(store, EventCollection::UserActivity, now)
}

/// Distinct guilds active in the trailing day/week/month.
pub fn num_active_guilds<S: MetricsQuery + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<WindowCounts> {
    activity_windows(store, EventCollection::GuildActivity, now)
}

// Each window is counted fresh and independently; a user active today is
// also counted in the week and month windows.
fn activity_windows<S: MetricsQuery + ?Sized>(
    store: &S,
    collection: EventCollection,
    now: DateTime<Utc>,
) -> Result<WindowCounts> {
    Ok(WindowCounts {
        day: count_in_window(store, collection, None, now, Duration::days(1))?,
        week: count_in_window(store, collection, None, now, Duration::days(7))?,
        month: count_in_window(store, collection, None, now, Duration::days(30))?,
    })
}

/// Window counts plus all-time total for one alias/snippet call category.
///
/// One routine serves all eight categories; `to_date` has no lower bound
/// (everything up to and including `now`).
pub fn alias_calls<S: MetricsQuery + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    kind: AliasEventKind,
) -> Result<CallStats> {
    let events = EventCollection::AliasEvents;
    Ok(CallStats {
        day: count_in_window(store, events, Some(kind), now, Duration::days(1))?,
        week: count_in_window(store, events, Some(kind), now, Duration::days(7))?,
        month: count_in_window(store, events, Some(kind), now, Duration::days(30))?,
        to_date: store.count(
            events,
            &EventFilter {
                kind: Some(kind),
                after: None,
                through: Some(now),
            },
        )?,
    })
}
