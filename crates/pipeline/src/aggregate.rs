//! Per-day, per-user event counting.
//!
//! Pure functions only: bytes in, rows out. Reading the raw file and writing
//! the table are the `calculate_stats` task's job.

use std::collections::BTreeMap;

use crate::{DailyUserCount, EventRecord};

/// Parses a raw event document (a JSON array of event objects).
///
/// Anything other than an array of objects carrying `date` and `user` is an
/// error; nothing is skipped.
pub fn parse_event_document(raw: &[u8]) -> Result<Vec<EventRecord>, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Groups events by `(date, user)` and counts each group.
///
/// Rows come back sorted by date, then user, so the output is a pure
/// function of the input multiset. The counts sum to the number of input
/// events.
pub fn count_by_date_and_user<'a, I>(events: I) -> Vec<DailyUserCount>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut groups: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for event in events {
        *groups.entry((event.date.as_str(), event.user.as_str())).or_default() += 1;
    }

    groups
        .into_iter()
        .map(|((date, user), count)| DailyUserCount {
            date: date.to_owned(),
            user: user.to_owned(),
            count,
        })
        .collect()
}
