//! Parsing of the human date strings the source site prints.
//!
//! Times are US Eastern unless the string says `UTC`. Dates without a year
//! take the current year, rolled forward one year when that lands more than
//! six months in the past (listings show upcoming events without a year).

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::America::New_York;
use regex::{Captures, Regex};

static TIME_BEFORE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{1,2})(?::(\d{2}))?\s*([ap]m),?\s+(\d{4})")
        .unwrap()
});
static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})(?:,?\s+(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*([ap]m))?",
    )
    .unwrap()
});
static DOTTED_US: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\s+at\s+(\d{1,2}):(\d{2})\s*([ap]m))?")
        .unwrap()
});
static YEAR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})\b").unwrap());
static SLASHED_US: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static YEARLESS_WITH_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z]+)\.?\s+(\d{1,2}),?\s+(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*([ap]m)")
        .unwrap()
});
static YEARLESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([a-z]+)\.?\s+(\d{1,2})\b").unwrap());
static UTC_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bUTC\b").unwrap());

/// Parse a listing or detail-page date string into a UTC instant.
///
/// `now` anchors year inference for strings without a year.
pub fn parse_site_datetime(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let clean = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.is_empty() || clean.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let is_utc = UTC_MARKER.is_match(&clean);
    let local = parse_local(&clean, now)?;
    Some(if is_utc {
        Utc.from_utc_datetime(&local)
    } else {
        eastern_to_utc(local)
    })
}

/// Parse a date-only field (date of birth, last fight) as an Eastern calendar date.
pub fn parse_site_date(raw: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    parse_site_datetime(raw, now).map(to_eastern_date)
}

fn parse_local(clean: &str, now: DateTime<Utc>) -> Option<NaiveDateTime> {
    for caps in TIME_BEFORE_YEAR.captures_iter(clean) {
        if let Some(dt) = month_name_date(&caps, 1, 2, Some(6))
            .and_then(|d| with_time(d, &caps, 3, 4, 5))
        {
            return Some(dt);
        }
    }
    for caps in MONTH_DAY_YEAR.captures_iter(clean) {
        if let Some(dt) = month_name_date(&caps, 1, 2, Some(3))
            .and_then(|d| with_time(d, &caps, 4, 5, 6))
        {
            return Some(dt);
        }
    }
    if let Some(caps) = DOTTED_US.captures(clean) {
        let date = numeric_date(&caps, 3, 1, 2)?;
        return with_time(date, &caps, 4, 5, 6);
    }
    if let Some(caps) = YEAR_FIRST.captures(clean) {
        return numeric_date(&caps, 1, 2, 3).map(midnight);
    }
    if let Some(caps) = SLASHED_US.captures(clean) {
        return numeric_date(&caps, 3, 1, 2).map(midnight);
    }
    for caps in YEARLESS_WITH_TIME.captures_iter(clean) {
        if let Some(dt) = month_name_date(&caps, 1, 2, None)
            .and_then(|d| with_time(d, &caps, 3, 4, 5))
        {
            return Some(roll_forward(dt, now));
        }
    }
    for caps in YEARLESS.captures_iter(clean) {
        if let Some(date) = month_name_date(&caps, 1, 2, None) {
            return Some(roll_forward(midnight(date), now));
        }
    }
    None
}

/// Builds a date from a month name; a missing year group means "placeholder year",
/// fixed up later by [`roll_forward`].
fn month_name_date(
    caps: &Captures<'_>,
    month: usize,
    day: usize,
    year: Option<usize>,
) -> Option<NaiveDate> {
    let month = month_number(caps.get(month)?.as_str())?;
    let day: u32 = caps.get(day)?.as_str().parse().ok()?;
    let year: i32 = match year {
        Some(idx) => caps.get(idx)?.as_str().parse().ok()?,
        // 2000 is a leap year, so "Feb 29" survives until the real year is chosen.
        None => 2000,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn numeric_date(caps: &Captures<'_>, year: usize, month: usize, day: usize) -> Option<NaiveDate> {
    let year: i32 = caps.get(year)?.as_str().parse().ok()?;
    let month: u32 = caps.get(month)?.as_str().parse().ok()?;
    let day: u32 = caps.get(day)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Attach an optional 12-hour clock time; absent groups mean midnight.
fn with_time(
    date: NaiveDate,
    caps: &Captures<'_>,
    hour: usize,
    minute: usize,
    meridiem: usize,
) -> Option<NaiveDateTime> {
    let (Some(h), Some(ampm)) = (caps.get(hour), caps.get(meridiem)) else {
        return Some(midnight(date));
    };
    let mut h: u32 = h.as_str().parse().ok()?;
    let m: u32 = match caps.get(minute) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if h == 0 || h > 12 {
        return None;
    }
    let pm = ampm.as_str().eq_ignore_ascii_case("pm");
    if pm && h != 12 {
        h += 12;
    } else if !pm && h == 12 {
        h = 0;
    }
    Some(date.and_time(NaiveTime::from_hms_opt(h, m, 0)?))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Replace the placeholder year with the current one, or the next one when the
/// result would be more than ~six months in the past.
fn roll_forward(placeholder: NaiveDateTime, now: DateTime<Utc>) -> NaiveDateTime {
    let now_local = utc_to_eastern(now);
    let this_year = now_local.year();
    let candidate = set_year(placeholder, this_year);
    if candidate < now_local - TimeDelta::days(183) {
        set_year(placeholder, this_year + 1)
    } else {
        candidate
    }
}

// Feb 29 falls back to Feb 28 in non-leap years.
fn set_year(dt: NaiveDateTime, year: i32) -> NaiveDateTime {
    dt.with_year(year)
        .or_else(|| (dt - TimeDelta::days(1)).with_year(year))
        .unwrap_or(dt)
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    let month = match name.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

// -- US Eastern time --

/// Interpret a naive wall-clock time as US Eastern and convert to UTC.
///
/// A repeated fall-back hour resolves to its first (daylight) reading; a
/// wall time inside the skipped spring-forward hour is read as standard time.
pub fn eastern_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    match New_York.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&(local + TimeDelta::hours(5))),
    }
}

pub fn utc_to_eastern(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&New_York).naive_local()
}

pub fn to_eastern_date(instant: DateTime<Utc>) -> NaiveDate {
    utc_to_eastern(instant).date()
}
