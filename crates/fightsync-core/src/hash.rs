//! Content hashing for change detection.
//!
//! A digest is computed over a canonical form of a record's scalar fields,
//! so field order, `null` vs `""`, stray whitespace and `"5"` vs `5` never
//! register as a change.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::models::{EventPage, FightRecord, Record};

/// Key under which the fight-card digest is folded into an event's hash.
pub const FIGHT_CARD_KEY: &str = "fight_card";

/// SHA-256 of a string, rendered as lowercase hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reduce a record to its canonical scalar form, sorted by key.
pub fn canonicalize(record: &Record) -> BTreeMap<String, Value> {
    record
        .iter()
        .filter_map(|(key, value)| canonical_scalar(value).map(|v| (key.clone(), v)))
        .collect()
}

fn canonical_scalar(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => Some(
            n.as_f64()
                .map(canonical_number)
                .unwrap_or_else(|| Value::Number(n.clone())),
        ),
        Value::String(s) => {
            let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() || collapsed.eq_ignore_ascii_case("n/a") {
                return None;
            }
            match collapsed.parse::<f64>() {
                Ok(f) if f.is_finite() && looks_numeric(&collapsed) => Some(canonical_number(f)),
                _ => Some(Value::String(collapsed)),
            }
        }
    }
}

// Keeps words like "infinity" or "nan" as text.
fn looks_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

fn canonical_number(f: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if f.fract() == 0.0 && f.abs() < MAX_EXACT {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Digest of a record's canonical form.
pub fn record_hash(record: &Record) -> String {
    let canonical = canonicalize(record);
    // BTreeMap of plain JSON values always serializes.
    let json = serde_json::to_string(&canonical).unwrap_or_default();
    compute_hash(&json)
}

/// Digest of any serializable struct, via its JSON object form.
pub fn hash_of<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(record_hash(&to_record(value)?))
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Generic(format!(
            "Expected an object to hash, got {other}"
        ))),
    }
}

/// Hash of one fight-card row: both fighter identities plus bout details.
pub fn fight_hash(fight: &FightRecord) -> Result<String, AppError> {
    let mut record = to_record(&fight.details)?;
    record.insert(
        "fighter_1_url".into(),
        Value::String(fight.fighter_1.source_url.clone()),
    );
    record.insert(
        "fighter_2_url".into(),
        Value::String(fight.fighter_2.source_url.clone()),
    );
    Ok(record_hash(&record))
}

/// Hash of an event page: header scalars plus one digest for the whole card.
///
/// The card digest is order-sensitive so a re-ordered card counts as a change.
pub fn event_page_hash(page: &EventPage) -> Result<String, AppError> {
    let mut record = to_record(&page.event)?;
    if !page.fights.is_empty() {
        let rows = page
            .fights
            .iter()
            .map(fight_hash)
            .collect::<Result<Vec<_>, _>>()?;
        record.insert(
            FIGHT_CARD_KEY.into(),
            Value::String(compute_hash(&rows.join(","))),
        );
    }
    Ok(record_hash(&record))
}
