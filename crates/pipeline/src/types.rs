//! Shared value types for the pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (a window's start precedes its end, a group count
//! is at least one) and participate in domain computations.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::PipelineError;

// ---------------------------------------------------------------------------
// Batch window
// ---------------------------------------------------------------------------

/// The logical interval `[start, end)` a DAG run processes.
///
/// `start` corresponds to the orchestrator's execution date and `end` to the
/// next execution date. Both are rendered into templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct BatchWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<WindowBounds> for BatchWindow {
    type Error = PipelineError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl BatchWindow {
    /// Creates a window, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PipelineError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(PipelineError::InvalidWindow { start, end })
        }
    }

    /// Window of `width` starting at `start`, or `None` if the end is not
    /// representable or `width` is not positive.
    pub(crate) fn spanning(start: DateTime<Utc>, width: TimeDelta) -> Option<Self> {
        start
            .checked_add_signed(width)
            .filter(|end| start < *end)
            .map(|end| Self { start, end })
    }

    /// Inclusive start of the window (the execution date).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the window (the next execution date).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Calendar date the window starts on.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Window start as `YYYY-MM-DD`.
    pub fn ds(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Window start as `YYYYMMDD`.
    pub fn ds_nodash(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// Window end as `YYYY-MM-DD`.
    pub fn next_ds(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for BatchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One record of the raw event document.
///
/// Only `date` and `user` are read; any other fields in the source object
/// are ignored. `date` is kept verbatim so the output groups on exactly the
/// values the service returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event date as sent by the service (normally `YYYY-MM-DD`).
    pub date: String,
    /// User identifier; JSON strings and integers are both accepted.
    #[serde(deserialize_with = "deserialize_user")]
    pub user: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUser {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

fn deserialize_user<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawUser::deserialize(deserializer)? {
        RawUser::Text(s) => s,
        RawUser::Signed(n) => n.to_string(),
        RawUser::Unsigned(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// One row of the output table: how many events `user` produced on `date`.
///
/// Field order is the column order of the written table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DailyUserCount {
    /// Event date.
    pub date: String,
    /// User identifier.
    pub user: String,
    /// Number of events for this `(date, user)` pair; always at least one.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn window_formats_dates() {
        let window = BatchWindow::new(at(2023, 11, 1), at(2023, 11, 2)).unwrap();
        assert_eq!(window.ds(), "2023-11-01");
        assert_eq!(window.ds_nodash(), "20231101");
        assert_eq!(window.next_ds(), "2023-11-02");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = BatchWindow::new(at(2023, 11, 2), at(2023, 11, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWindow { .. }));
        assert!(BatchWindow::new(at(2023, 11, 1), at(2023, 11, 1)).is_err());
    }

    #[test]
    fn deserializing_a_window_checks_its_bounds() {
        let window: BatchWindow = serde_json::from_str(
            r#"{"start":"2023-11-01T00:00:00Z","end":"2023-11-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(window.ds(), "2023-11-01");

        assert!(serde_json::from_str::<BatchWindow>(
            r#"{"start":"2023-11-02T00:00:00Z","end":"2023-11-01T00:00:00Z"}"#,
        )
        .is_err());
    }

    #[test]
    fn spanning_refuses_unrepresentable_ends() {
        let last = NaiveDate::MAX.and_time(chrono::NaiveTime::MIN).and_utc();
        assert!(BatchWindow::spanning(last, TimeDelta::days(1)).is_none());
        assert!(BatchWindow::spanning(at(2023, 11, 1), TimeDelta::zero()).is_none());
        assert_eq!(
            BatchWindow::spanning(at(2023, 11, 1), TimeDelta::days(1)).map(|w| w.end()),
            Some(at(2023, 11, 2))
        );
    }

    #[test]
    fn event_record_accepts_numeric_users_and_ignores_extra_fields() {
        let record: EventRecord = serde_json::from_str(
            r#"{"date":"2023-11-01","user":42,"ip":"10.0.0.1"}"#,
        )
        .unwrap();
        assert_eq!(record.user, "42");
        assert_eq!(record.date, "2023-11-01");
    }

    #[test]
    fn event_record_requires_date_and_user() {
        assert!(serde_json::from_str::<EventRecord>(r#"{"user":"a"}"#).is_err());
        assert!(serde_json::from_str::<EventRecord>(r#"{"date":"2023-11-01"}"#).is_err());
        assert!(serde_json::from_str::<EventRecord>(r#"{"date":"2023-11-01","user":null}"#).is_err());
    }
}
