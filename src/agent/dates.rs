//! Relative date resolution.
//!
//! Turns phrases such as "next week" or "past 14 days" into absolute,
//! inclusive `(start, end)` pairs relative to a reference date. Weeks run
//! Monday to Sunday.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Months, NaiveDate};
use regex::Regex;

static DAYS_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(next|coming|past|last|previous)\s+(\d{1,3})\s+days?\b").ok()
});

/// Monday of the week containing `day`.
#[must_use]
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Monday–Sunday of the calendar week after the one containing `today`.
#[must_use]
pub fn next_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(today) + Duration::days(7);
    (start, start + Duration::days(6))
}

/// Monday–Sunday of the week containing `today`.
#[must_use]
pub fn this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(today);
    (start, start + Duration::days(6))
}

/// Monday–Sunday of the week before the one containing `today`.
#[must_use]
pub fn last_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(today) - Duration::days(7);
    (start, start + Duration::days(6))
}

fn month_of(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day.with_day(1).unwrap_or(day);
    let end = start
        .checked_add_months(Months::new(1))
        .map_or(start, |next| next - Duration::days(1));
    (start, end)
}

/// First to last day of the month containing `today`.
#[must_use]
pub fn this_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    month_of(today)
}

/// First to last day of the following month.
#[must_use]
pub fn next_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (start, _) = month_of(today);
    month_of(start.checked_add_months(Months::new(1)).unwrap_or(start))
}

/// First to last day of the previous month.
#[must_use]
pub fn last_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (start, _) = month_of(today);
    month_of(start - Duration::days(1))
}

fn year_of(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
    (start, end)
}

/// Resolves the first relative date phrase found in `text`.
///
/// Returns `None` when no known phrase is present.
#[must_use]
pub fn resolve_relative(text: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let lowered = text.to_lowercase();
    let has = |phrase: &str| lowered.contains(phrase);

    if let Some(re) = DAYS_PATTERN.as_ref()
        && let Some(caps) = re.captures(&lowered)
    {
        let n: i64 = caps.get(2)?.as_str().parse().ok()?;
        return Some(match caps.get(1)?.as_str() {
            "next" | "coming" => (today, today + Duration::days(n)),
            _ => (today - Duration::days(n), today),
        });
    }

    let tomorrow = today + Duration::days(1);
    let yesterday = today - Duration::days(1);
    let range = if has("next week") || has("coming week") {
        next_week(today)
    } else if has("last week") || has("previous week") || has("past week") {
        last_week(today)
    } else if has("this week") {
        this_week(today)
    } else if has("next month") || has("coming month") {
        next_month(today)
    } else if has("last month") || has("previous month") || has("past month") {
        last_month(today)
    } else if has("this month") {
        this_month(today)
    } else if has("this year") {
        year_of(today)
    } else if has("tomorrow") {
        (tomorrow, tomorrow)
    } else if has("yesterday") {
        (yesterday, yesterday)
    } else if has("today") {
        (today, today)
    } else {
        return None;
    };
    Some(range)
}

/// Parses an absolute `YYYY-MM-DD` date, falling back to a relative phrase.
///
/// `use_end` selects which bound of a resolved relative range to return.
#[must_use]
pub fn parse_bound(raw: &str, today: NaiveDate, use_end: bool) -> Option<NaiveDate> {
    let raw = raw.trim();
    let iso = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok().or_else(|| {
        resolve_relative(raw, today).map(|(start, end)| if use_end { end } else { start })
    })
}
