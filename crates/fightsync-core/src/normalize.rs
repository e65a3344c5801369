//! Field-level clean-up applied between extraction and hashing.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::collapse_whitespace;

static RECORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)-(\d+)-(\d+)(?:,\s*(\d+)\s*NC)?").unwrap());
static HEIGHT_CM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((\d+)\s*cm\)").unwrap());
static WEIGHT_LBS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d.]+)\s*lbs").unwrap());
static ROUNDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*x\s*(\d+)").unwrap());
static FIRST_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").unwrap());

const LBS_TO_KG: f64 = 0.45359237;

/// Collapse whitespace and map placeholder values (`""`, `N/A`, `-`) to `None`.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let value = collapse_whitespace(raw?);
    match value.as_str() {
        "" | "-" | "--" => None,
        v if v.eq_ignore_ascii_case("n/a") => None,
        _ => Some(value),
    }
}

/// `"20-3-1, 2 NC"` → `"20-3-1-2"`; `"20-3-1 (Win-Loss-Draw)"` → `"20-3-1"`.
///
/// Strings that do not look like a record are returned unchanged.
pub fn normalize_record(raw: &str) -> Option<String> {
    let raw = clean_text(Some(raw))?;
    let Some(caps) = RECORD.captures(&raw) else {
        return Some(raw);
    };
    let main = format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]);
    Some(match caps.get(4) {
        Some(nc) => format!("{main}-{}", nc.as_str()),
        None => main,
    })
}

/// Sum of the numeric parts of a dash-separated record. `None` when there
/// are no numbers or the sum does not fit.
pub fn total_fights(record: &str) -> Option<i32> {
    let parts: Vec<i32> = record
        .split('-')
        .filter_map(|p| p.trim().parse::<i32>().ok())
        .collect();
    if parts.is_empty() {
        return None;
    }
    parts.iter().try_fold(0i32, |acc, n| acc.checked_add(*n))
}

/// `5'11" (180cm)` → `180cm`; anything else is kept as cleaned text.
pub fn height_cm(raw: &str) -> Option<String> {
    let raw = clean_text(Some(raw))?;
    match HEIGHT_CM.captures(&raw) {
        Some(caps) => Some(format!("{}cm", &caps[1])),
        None => Some(raw),
    }
}

/// `"205.5 lbs (93.2 kgs)"` → `93.2`, rounded to one decimal.
pub fn weigh_in_kg(raw: &str) -> Option<f64> {
    let caps = WEIGHT_LBS.captures(raw)?;
    let lbs: f64 = caps[1].parse().ok()?;
    Some((lbs * LBS_TO_KG * 10.0).round() / 10.0)
}

/// `"3 x 5"` → `(3, 5)`.
pub fn parse_rounds(raw: &str) -> Option<(i32, i32)> {
    let caps = ROUNDS.captures(raw)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Split a finish line on its first comma: `"KO/TKO, Punches"` →
/// (`"KO/TKO"`, `"Punches"`).
pub fn split_finish(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(text) = clean_text(raw) else {
        return (None, None);
    };
    match text.split_once(',') {
        Some((method, details)) => (
            clean_text(Some(method)),
            clean_text(Some(details)),
        ),
        None => (Some(text), None),
    }
}

/// A bout result must contain letters (`Win`, `Loss`, `Draw`).
///
/// The result badge position sometimes holds the fighter's record
/// (`"16-0"`) on upcoming cards; that is not a result.
pub fn parse_result(raw: Option<&str>) -> Option<String> {
    let value = clean_text(raw)?;
    if value.chars().any(char::is_alphabetic) {
        Some(value)
    } else {
        None
    }
}

/// First integer in a string: `"36 years, 2 months"` → `36`.
pub fn parse_int(raw: &str) -> Option<i32> {
    FIRST_INT.find(raw)?.as_str().parse().ok()
}
