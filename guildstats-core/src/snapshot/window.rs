//! Trailing-window event counting
//!
//! One primitive shared by every windowed metric: count events in a window
//! ending at a reference instant. The interval is left-open, right-closed
//! (`now - window < t <= now`), so an event exactly `window` old falls out
//! while an event stamped exactly `now` is counted.

use crate::error::Result;
use crate::store::{AliasEventKind, EventCollection, EventFilter, MetricsQuery};
use chrono::{DateTime, Duration, Utc};

/// Count events in `collection` whose ordering timestamp lies in
/// `(now - window, now]`, optionally restricted to one alias category.
///
/// No side effects; store failures propagate untouched.
pub fn count_in_window<S: MetricsQuery + ?Sized>(
    store: &S,
    collection: EventCollection,
    kind: Option<AliasEventKind>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<i64> {
    let filter = EventFilter {
        kind,
        after: Some(now - window),
        through: Some(now),
    };
    store.count(collection, &filter)
}
