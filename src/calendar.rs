//! Local calendar-day arithmetic over epoch-millisecond timestamps.
//!
//! Day boundaries and same-day tests use the process-local time zone.
//! Two instants are on the same day when their local (year, day-of-year)
//! pairs match; proximity in milliseconds is irrelevant.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::task::format_time_label;

/// Inclusive millisecond range covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    /// 00:00:00.000 local.
    pub start: i64,
    /// 23:59:59.999 local.
    pub end: i64,
}

impl DayRange {
    /// Range for the local day `date`.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            start: start_of_day(date),
            end: end_of_day(date),
        }
    }

    #[must_use]
    pub fn contains(&self, at: i64) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Day of `at` relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum RelativeDay {
    Today,
    Tomorrow,
    Yesterday,
    Other(NaiveDate),
}

impl std::fmt::Display for RelativeDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => f.write_str("Today"),
            Self::Tomorrow => f.write_str("Tomorrow"),
            Self::Yesterday => f.write_str("Yesterday"),
            Self::Other(date) => f.write_str(&format_date(*date)),
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a local date-time.
///
/// Instants outside the range chrono can show in every time zone are
/// clamped to the nearest end of that range.
#[must_use]
pub fn local_datetime(at: i64) -> DateTime<Local> {
    clamped_utc(at).with_timezone(&Local)
}

/// Whether `at` converts to a local date-time without clamping.
#[must_use]
pub fn is_representable(at: i64) -> bool {
    clamped_utc(at).timestamp_millis() == at
}

// One day of margin keeps the local wall time in range for any offset.
fn clamped_utc(at: i64) -> DateTime<Utc> {
    let margin = chrono::Duration::days(1);
    let min = DateTime::<Utc>::MIN_UTC + margin;
    let max = DateTime::<Utc>::MAX_UTC - margin;
    match DateTime::<Utc>::from_timestamp_millis(at) {
        Some(dt) => dt.clamp(min, max),
        None if at < 0 => min,
        None => max,
    }
}

/// Local calendar date containing `at`.
#[must_use]
pub fn local_date(at: i64) -> NaiveDate {
    local_datetime(at).date_naive()
}

/// Epoch milliseconds of local midnight starting `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> i64 {
    resolve_local(date.and_time(chrono::NaiveTime::MIN), false)
}

/// Epoch milliseconds of 23:59:59.999 local on `date`.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> i64 {
    let last = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    resolve_local(last, true)
}

/// Epoch milliseconds of local midnight starting the day containing `now`.
#[must_use]
pub fn start_of_today(now: i64) -> i64 {
    start_of_day(local_date(now))
}

/// Local wall-clock time to epoch milliseconds.
///
/// Ambiguous times (clocks going back) pick the earlier or later instant as
/// requested; nonexistent times (clocks going forward) shift past the gap.
#[must_use]
pub fn resolve_local(naive: NaiveDateTime, latest: bool) -> i64 {
    let resolved = Local.from_local_datetime(&naive);
    let picked = if latest {
        resolved.latest()
    } else {
        resolved.earliest()
    };
    if let Some(dt) = picked {
        return dt.timestamp_millis();
    }
    naive
        .checked_add_signed(chrono::Duration::hours(1))
        .and_then(|shifted| Local.from_local_datetime(&shifted).earliest())
        .map_or_else(|| naive.and_utc().timestamp_millis(), |dt| dt.timestamp_millis())
}

/// Whether `a` and `b` fall on the same local calendar day.
#[must_use]
pub fn same_day(a: i64, b: i64) -> bool {
    let a = local_datetime(a);
    let b = local_datetime(b);
    a.year() == b.year() && a.ordinal() == b.ordinal()
}

/// Classify the day of `at` against the day of `now`.
#[must_use]
pub fn relative_day(at: i64, now: i64) -> RelativeDay {
    relative_date(local_date(at), local_date(now))
}

/// Classify `date` against `today`.
#[must_use]
pub fn relative_date(date: NaiveDate, today: NaiveDate) -> RelativeDay {
    if date == today {
        RelativeDay::Today
    } else if today.succ_opt() == Some(date) {
        RelativeDay::Tomorrow
    } else if today.pred_opt() == Some(date) {
        RelativeDay::Yesterday
    } else {
        RelativeDay::Other(date)
    }
}

/// Absolute date as `"Oct 3, 2026"`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Abbreviated local weekday name, e.g. `"Mon"`.
#[must_use]
pub fn weekday_abbrev(at: i64) -> String {
    local_datetime(at).format("%a").to_string()
}

/// Local day of month without padding, e.g. `"8"`.
#[must_use]
pub fn day_of_month(at: i64) -> String {
    local_datetime(at).day().to_string()
}

/// 12-hour time label for the local time of `at`.
#[must_use]
pub fn time_label_for(at: i64) -> String {
    let dt = local_datetime(at);
    format_time_label(dt.hour(), dt.minute())
}
