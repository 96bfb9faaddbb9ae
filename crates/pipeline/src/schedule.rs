//! Schedule presets and the window arithmetic built on them.
//!
//! Only fixed-width presets are supported. Windows are aligned to interval
//! boundaries in UTC: hours start at `:00`, days at midnight, weeks at
//! midnight on Sunday.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{BatchWindow, PipelineError};

/// How often a DAG produces a new batch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScheduleInterval {
    /// `@hourly`
    Hourly,
    /// `@daily`
    Daily,
    /// `@weekly` (weeks start on Sunday)
    Weekly,
}

impl ScheduleInterval {
    /// Width of one window.
    pub fn period(self) -> TimeDelta {
        match self {
            Self::Hourly => TimeDelta::hours(1),
            Self::Daily => TimeDelta::days(1),
            Self::Weekly => TimeDelta::weeks(1),
        }
    }

    /// Rounds `t` down to the start of the window that contains it.
    pub fn align(self, t: DateTime<Utc>) -> Result<DateTime<Utc>, PipelineError> {
        let midnight = t.date_naive().and_time(NaiveTime::MIN).and_utc();
        let aligned = match self {
            Self::Hourly => midnight.checked_add_signed(TimeDelta::hours(i64::from(t.hour()))),
            Self::Daily => Some(midnight),
            Self::Weekly => midnight
                .checked_sub_signed(TimeDelta::days(i64::from(t.weekday().num_days_from_sunday()))),
        };
        aligned.ok_or_else(|| self.out_of_range(t))
    }

    /// The window containing `t`.
    pub fn window_containing(self, t: DateTime<Utc>) -> Result<BatchWindow, PipelineError> {
        let start = self.align(t)?;
        BatchWindow::spanning(start, self.period()).ok_or_else(|| self.out_of_range(t))
    }

    /// The window containing midnight of `date`.
    pub fn window_for_date(self, date: NaiveDate) -> Result<BatchWindow, PipelineError> {
        self.window_containing(date.and_time(NaiveTime::MIN).and_utc())
    }

    /// The most recent window that has fully elapsed at `now`.
    ///
    /// A run started at `2023-11-02T08:00Z` on a daily schedule processes
    /// `[2023-11-01, 2023-11-02)`.
    pub fn latest_complete_window(self, now: DateTime<Utc>) -> Result<BatchWindow, PipelineError> {
        let previous = self
            .align(now)?
            .checked_sub_signed(self.period())
            .ok_or_else(|| self.out_of_range(now))?;
        self.window_containing(previous)
    }

    fn out_of_range(self, at: DateTime<Utc>) -> PipelineError {
        PipelineError::WindowOutOfRange {
            at,
            schedule: self.as_str(),
        }
    }

    /// The preset string, e.g. `"@daily"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "@hourly",
            Self::Daily => "@daily",
            Self::Weekly => "@weekly",
        }
    }
}

impl FromStr for ScheduleInterval {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "@hourly" => Ok(Self::Hourly),
            "@daily" => Ok(Self::Daily),
            "@weekly" => Ok(Self::Weekly),
            other => Err(PipelineError::InvalidSchedule {
                value: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for ScheduleInterval {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleInterval> for String {
    fn from(interval: ScheduleInterval) -> Self {
        interval.as_str().to_owned()
    }
}

impl std::fmt::Display for ScheduleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_presets() {
        assert_eq!("@daily".parse::<ScheduleInterval>().unwrap(), ScheduleInterval::Daily);
        assert_eq!(" @hourly ".parse::<ScheduleInterval>().unwrap(), ScheduleInterval::Hourly);
        assert!(matches!(
            "0 0 * * *".parse::<ScheduleInterval>(),
            Err(PipelineError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn daily_window_for_date_spans_one_day() {
        let window = ScheduleInterval::Daily.window_for_date(NaiveDate::from_ymd_opt(2023, 11, 1).unwrap())
            .unwrap();
        assert_eq!(window.start(), at(2023, 11, 1, 0, 0));
        assert_eq!(window.end(), at(2023, 11, 2, 0, 0));
    }

    #[test]
    fn latest_complete_window_is_the_previous_interval() {
        let daily = ScheduleInterval::Daily.latest_complete_window(at(2023, 11, 2, 8, 30)).unwrap();
        assert_eq!(daily.ds(), "2023-11-01");
        assert_eq!(daily.next_ds(), "2023-11-02");

        let hourly = ScheduleInterval::Hourly.latest_complete_window(at(2023, 11, 2, 0, 15)).unwrap();
        assert_eq!(hourly.start(), at(2023, 11, 1, 23, 0));
        assert_eq!(hourly.end(), at(2023, 11, 2, 0, 0));
    }

    #[test]
    fn weekly_windows_start_on_sunday() {
        // 2023-11-01 is a Wednesday.
        let window = ScheduleInterval::Weekly.window_containing(at(2023, 11, 1, 12, 0)).unwrap();
        assert_eq!(window.start(), at(2023, 10, 29, 0, 0));
        assert_eq!(window.end(), at(2023, 11, 5, 0, 0));
    }

    #[test]
    fn windows_at_the_edge_of_the_calendar_are_errors() {
        for schedule in [ScheduleInterval::Daily, ScheduleInterval::Weekly] {
            assert!(matches!(
                schedule.window_for_date(NaiveDate::MAX),
                Err(PipelineError::WindowOutOfRange { .. })
            ));
        }
        // The first hour of the last day still ends inside the calendar.
        assert!(ScheduleInterval::Hourly.window_for_date(NaiveDate::MAX).is_ok());
        assert!(ScheduleInterval::Daily.window_for_date(NaiveDate::MIN).is_ok());
    }

    #[test]
    fn serde_round_trips_through_preset_strings() {
        let json = serde_json::to_string(&ScheduleInterval::Weekly).unwrap();
        assert_eq!(json, "\"@weekly\"");
        assert!(serde_json::from_str::<ScheduleInterval>("\"@yearly\"").is_err());
    }
}
