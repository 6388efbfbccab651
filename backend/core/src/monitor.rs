//! Hourly presence timelines built from heartbeat events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::event::Event;

/// Number of hourly buckets shown on the monitor dashboard.
pub const DEFAULT_WINDOW_HOURS: usize = 48;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Identifies one heartbeat source on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub origin: String,
    pub owner: String,
}

impl SourceKey {
    pub fn of(event: &Event) -> Self {
        Self {
            origin: event.origin.clone(),
            owner: event.owner.clone(),
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.origin, self.owner)
    }
}

/// Whole hours between `created_at` and `now`, rounded down.
///
/// Timestamps after `now` give negative values.
fn elapsed_hours(now: DateTime<Utc>, created_at: DateTime<Utc>) -> i64 {
    (now - created_at).num_milliseconds().div_euclid(MILLIS_PER_HOUR)
}

/// Mark which of the last `window_hours` hours saw at least one event.
///
/// The result is in chronological order: index 0 is the oldest hour of the
/// window, the last index is the current hour. Events older than the window
/// or later than `now` are ignored.
pub fn bucketize<'a, I>(now: DateTime<Utc>, events: I, window_hours: usize) -> Vec<bool>
where
    I: IntoIterator<Item = &'a Event>,
{
    // hours[0] is the most recent hour while filling
    let mut hours = vec![false; window_hours];

    for event in events {
        let elapsed = elapsed_hours(now, event.created_at);
        if let Some(slot) = usize::try_from(elapsed)
            .ok()
            .and_then(|idx| hours.get_mut(idx))
        {
            *slot = true;
        }
    }

    hours.reverse();
    hours
}

/// Group events by `(origin, owner)` and bucketize each group.
pub fn timelines<'a, I>(
    now: DateTime<Utc>,
    events: I,
    window_hours: usize,
) -> BTreeMap<SourceKey, Vec<bool>>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut grouped: BTreeMap<SourceKey, Vec<&Event>> = BTreeMap::new();
    for event in events {
        grouped.entry(SourceKey::of(event)).or_default().push(event);
    }

    grouped
        .into_iter()
        .map(|(key, group)| {
            let hours = bucketize(now, group.iter().copied(), window_hours);
            (key, hours)
        })
        .collect()
}
