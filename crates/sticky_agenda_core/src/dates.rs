//! Date-only helpers and calendar bucketing.
//!
//! # Responsibility
//! - Provide canonical `YYYY-MM-DD` parsing/formatting for calendar dates.
//! - Classify dates into day/week/month buckets for agenda views.
//! - Build quick-filter date ranges (today, this week, overdue, ...).
//!
//! # Invariants
//! - Every comparison is date-only; time-of-day never participates.
//! - "Today" is the current UTC calendar date.
//! - Weeks start on Sunday.
//! - Unparseable string inputs are non-matching (`false`), never errors.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical calendar-date format used by records and criteria.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Current instant.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Calendar date after [`today`].
pub fn tomorrow() -> NaiveDate {
    next_day(today())
}

/// Returns `today()` in canonical `YYYY-MM-DD` form.
pub fn today_string() -> String {
    format_date(today())
}

/// Returns `tomorrow()` in canonical `YYYY-MM-DD` form.
pub fn tomorrow_string() -> String {
    format_date(tomorrow())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// Returns `None` for any other shape, including full timestamps and
/// out-of-range components such as `2025-02-30`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if !DATE_RE.is_match(trimmed) {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

/// Parses an RFC 3339 timestamp, or a bare calendar date as UTC midnight.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats an instant as RFC 3339 UTC keeping sub-second precision.
///
/// The output parses back through [`parse_timestamp`] to the same instant.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Calendar date an instant falls on.
pub fn date_of(instant: &DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

pub fn is_past(date: NaiveDate) -> bool {
    is_past_on(date, today())
}

pub fn is_past_on(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

pub fn is_today(date: NaiveDate) -> bool {
    date == today()
}

pub fn is_tomorrow(date: NaiveDate) -> bool {
    date == tomorrow()
}

pub fn is_future(date: NaiveDate) -> bool {
    date > today()
}

/// Inclusive range check; an absent bound leaves that side open.
pub fn is_in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_some_and(|start| date < start) {
        return false;
    }
    if end.is_some_and(|end| date > end) {
        return false;
    }
    true
}

/// String form of [`is_past`]; unparseable input is never past.
pub fn is_past_str(value: &str) -> bool {
    parse_date(value).is_some_and(is_past)
}

/// String form of [`is_in_range`].
///
/// Returns `false` when the date or any provided bound cannot be parsed.
pub fn is_in_range_str(value: &str, start: Option<&str>, end: Option<&str>) -> bool {
    let Some(date) = parse_date(value) else {
        return false;
    };
    let start = match start {
        Some(raw) => match parse_date(raw) {
            Some(parsed) => Some(parsed),
            None => return false,
        },
        None => None,
    };
    let end = match end {
        Some(raw) => match parse_date(raw) {
            Some(parsed) => Some(parsed),
            None => return false,
        },
        None => None,
    };
    is_in_range(date, start, end)
}

/// Sunday that opens the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Saturday that closes the week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    let start = week_start(date);
    start.checked_add_days(Days::new(6)).unwrap_or(start)
}

pub fn is_same_week(a: NaiveDate, b: NaiveDate) -> bool {
    week_start(a) == week_start(b)
}

pub fn is_same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Absolute number of calendar days between two dates.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

/// Absolute number of days between two instants, rounded up.
///
/// Any partial day counts as a whole day: 25 hours apart is 2 days.
pub fn days_between_instants(a: &DateTime<Utc>, b: &DateTime<Utc>) -> i64 {
    let millis = (*b - *a).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Inclusive calendar-date window used by filters.
///
/// `start <= end` is not enforced; an inverted range simply matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Lower bound, `None` for unbounded.
    pub start: Option<NaiveDate>,
    /// Upper bound, `None` for unbounded.
    pub end: Option<NaiveDate>,
    /// Marks the synthetic overdue quick filter. Display only.
    #[serde(default)]
    pub overdue: bool,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end,
            overdue: false,
        }
    }

    /// Range covering exactly one day.
    pub fn single(date: NaiveDate) -> Self {
        Self::new(Some(date), Some(date))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        is_in_range(date, self.start, self.end)
    }
}

/// Range matching any date up to and including today.
///
/// The lower bound is left open rather than pinned to a floor date.
pub fn overdue_range() -> DateRange {
    overdue_range_on(today())
}

pub fn overdue_range_on(today: NaiveDate) -> DateRange {
    DateRange {
        start: None,
        end: Some(today),
        overdue: true,
    }
}

/// Quick-filter presets offered by the date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePreset {
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    Overdue,
}

impl DatePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::ThisWeek => "thisWeek",
            Self::ThisMonth => "thisMonth",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "thisWeek" => Some(Self::ThisWeek),
            "thisMonth" => Some(Self::ThisMonth),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range_on(today())
    }

    pub fn range_on(&self, today: NaiveDate) -> DateRange {
        match self {
            Self::Today => DateRange::single(today),
            Self::Tomorrow => DateRange::single(next_day(today)),
            Self::ThisWeek => DateRange::new(Some(week_start(today)), Some(week_end(today))),
            Self::ThisMonth => DateRange::new(Some(month_start(today)), Some(month_end(today))),
            Self::Overdue => overdue_range_on(today),
        }
    }
}

/// Calendar granularity of the agenda view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Day,
    Week,
    Month,
}

/// Movement request for the agenda reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
    /// Jump back to the period containing today.
    Current,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Whether `date` falls in the bucket that contains `reference`.
    pub fn contains(&self, reference: NaiveDate, date: NaiveDate) -> bool {
        match self {
            Self::Day => date == reference,
            Self::Week => is_same_week(date, reference),
            Self::Month => is_same_month(date, reference),
        }
    }

    /// Inclusive bounds of the bucket containing `reference`.
    pub fn period_range(&self, reference: NaiveDate) -> DateRange {
        match self {
            Self::Day => DateRange::single(reference),
            Self::Week => DateRange::new(Some(week_start(reference)), Some(week_end(reference))),
            Self::Month => {
                DateRange::new(Some(month_start(reference)), Some(month_end(reference)))
            }
        }
    }

    pub fn is_current_period(&self, reference: NaiveDate, today: NaiveDate) -> bool {
        self.contains(reference, today)
    }

    /// Moves `reference` one bucket in `direction`.
    ///
    /// Month steps clamp to the last valid day (Jan 31 -> Feb 28/29).
    pub fn navigate(&self, reference: NaiveDate, direction: Navigation, today: NaiveDate) -> NaiveDate {
        let shifted = match (self, direction) {
            (_, Navigation::Current) => Some(today),
            (Self::Day, Navigation::Previous) => reference.checked_sub_days(Days::new(1)),
            (Self::Day, Navigation::Next) => reference.checked_add_days(Days::new(1)),
            (Self::Week, Navigation::Previous) => reference.checked_sub_days(Days::new(7)),
            (Self::Week, Navigation::Next) => reference.checked_add_days(Days::new(7)),
            (Self::Month, Navigation::Previous) => reference.checked_sub_months(Months::new(1)),
            (Self::Month, Navigation::Next) => reference.checked_add_months(Months::new(1)),
        };
        shifted.unwrap_or(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        days_between_instants, format_timestamp, month_end, parse_date, parse_timestamp,
        week_start, DatePreset, Navigation, ViewMode,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(value: &str) -> NaiveDate {
        parse_date(value).expect("fixture date should parse")
    }

    #[test]
    fn parse_date_rejects_non_canonical_shapes() {
        assert!(parse_date("2025-1-5").is_none());
        assert!(parse_date("2025-02-30").is_none());
        assert!(parse_date("2025-02-03T10:00:00Z").is_none());
        assert_eq!(
            parse_date(" 2025-02-03 "),
            NaiveDate::from_ymd_opt(2025, 2, 3)
        );
    }

    #[test]
    fn timestamps_keep_sub_second_precision() {
        let instant = Utc
            .with_ymd_and_hms(2025, 3, 4, 5, 6, 7)
            .single()
            .expect("valid instant")
            + chrono::Duration::nanoseconds(123_456_789);
        let text = format_timestamp(&instant);
        assert_eq!(parse_timestamp(&text), Some(instant));
    }

    #[test]
    fn bare_date_timestamp_is_utc_midnight() {
        let parsed = parse_timestamp("2025-03-04").expect("date should parse");
        assert_eq!(format_timestamp(&parsed), "2025-03-04T00:00:00Z");
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2025-10-15 is a Wednesday.
        assert_eq!(week_start(date("2025-10-15")), date("2025-10-12"));
        assert_eq!(week_start(date("2025-10-12")), date("2025-10-12"));
        assert_eq!(week_start(date("2025-10-18")), date("2025-10-12"));
    }

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(month_end(date("2024-02-10")), date("2024-02-29"));
        assert_eq!(month_end(date("2025-12-01")), date("2025-12-31"));
    }

    #[test]
    fn partial_days_round_up() {
        let a = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap();
        let b = Utc.with_ymd_and_hms(2025, 1, 2, 1, 0, 0).single().unwrap();
        assert_eq!(days_between_instants(&a, &b), 2);
        assert_eq!(days_between_instants(&b, &a), 2);
        assert_eq!(days_between_instants(&a, &a), 0);
    }

    #[test]
    fn month_navigation_clamps_to_month_end() {
        let today = date("2025-06-01");
        let next = ViewMode::Month.navigate(date("2025-01-31"), Navigation::Next, today);
        assert_eq!(next, date("2025-02-28"));
        let current = ViewMode::Week.navigate(date("2020-01-01"), Navigation::Current, today);
        assert_eq!(current, today);
    }

    #[test]
    fn preset_names_roundtrip() {
        for preset in [
            DatePreset::Today,
            DatePreset::Tomorrow,
            DatePreset::ThisWeek,
            DatePreset::ThisMonth,
            DatePreset::Overdue,
        ] {
            assert_eq!(DatePreset::parse(preset.as_str()), Some(preset));
        }
    }
}
