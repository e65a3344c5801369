//! Turns extracted records into typed models.
//!
//! Field names here match the shipped schema files under `schemas/`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

use crate::dates::{parse_site_date, parse_site_datetime};
use crate::error::AppError;
use crate::models::{
    EventPage, EventRecord, FightDetails, FightHistoryEntry, FightRecord, FighterPage,
    FighterProfile, FighterRef, ListingEntry, Record,
};
use crate::normalize::{
    clean_text, height_cm, normalize_record, parse_int, parse_result, parse_rounds, split_finish,
    total_fights, weigh_in_kg,
};

/// Resolve a possibly relative link against the site base and drop any fragment.
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

fn text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => clean_text(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn list<'a>(record: &'a Record, key: &str) -> impl Iterator<Item = &'a Record> {
    record
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn link(record: &Record, key: &str, base: &Url) -> Option<String> {
    text(record, key).and_then(|href| absolutize(base, &href))
}

/// Listing rows from an `event_listing` extraction, in page order.
pub fn listing_entries(records: &[Record], base: &Url, now: DateTime<Utc>) -> Vec<ListingEntry> {
    records
        .iter()
        .flat_map(|r| list(r, "events"))
        .filter_map(|row| {
            let url = link(row, "url", base)?;
            Some(ListingEntry {
                url,
                name: text(row, "name"),
                date: text(row, "date").and_then(|d| parse_site_datetime(&d, now)),
            })
        })
        .collect()
}

/// Build an [`EventPage`] from an `event_detail` extraction.
pub fn event_page(
    source_url: &str,
    records: &[Record],
    base: &Url,
    now: DateTime<Utc>,
) -> Result<EventPage, AppError> {
    let record = records.first().ok_or_else(|| {
        AppError::ExtractionError(format!("No event record extracted from {source_url}"))
    })?;
    let name = text(record, "name").ok_or_else(|| {
        AppError::ExtractionError(format!("Event page {source_url} has no name"))
    })?;

    let event = EventRecord {
        source_url: source_url.to_string(),
        name,
        datetime: text(record, "datetime").and_then(|d| parse_site_datetime(&d, now)),
        promotion: text(record, "promotion"),
        venue: text(record, "venue"),
        location: text(record, "location"),
        broadcast: text(record, "broadcast"),
        mma_bouts: text(record, "mma_bouts").and_then(|b| parse_int(&b)),
        img_url: link(record, "img_url", base),
    };

    let mut fights = Vec::new();
    for (idx, row) in list(record, "fights").enumerate() {
        let bout_order = idx as i32 + 1;
        let (Some(f1_url), Some(f2_url)) = (
            link(row, "fighter_1_url", base),
            link(row, "fighter_2_url", base),
        ) else {
            tracing::warn!(url = %source_url, bout_order, "Skipping card row without both fighter links");
            continue;
        };
        let rounds = text(row, "rounds").and_then(|r| parse_rounds(&r));
        let (finish_by, finish_by_details) = split_finish(text(row, "finish").as_deref());
        fights.push(FightRecord {
            fighter_1: FighterRef::new(
                f1_url,
                text(row, "fighter_1_name").unwrap_or_else(|| "Unknown".into()),
            ),
            fighter_2: FighterRef::new(
                f2_url,
                text(row, "fighter_2_name").unwrap_or_else(|| "Unknown".into()),
            ),
            details: FightDetails {
                result_fighter_1: parse_result(text(row, "fighter_1_result").as_deref()),
                result_fighter_2: parse_result(text(row, "fighter_2_result").as_deref()),
                finish_by,
                finish_by_details,
                rounds: rounds.map(|(r, _)| r),
                minutes_per_round: rounds.map(|(_, m)| m),
                fight_type: text(row, "fight_type"),
                weight_class: text(row, "weight_class"),
                bout_order: Some(bout_order),
            },
        });
    }

    Ok(EventPage { event, fights })
}

/// Build a [`FighterPage`] from a `fighter_detail` extraction.
pub fn fighter_page(
    source_url: &str,
    records: &[Record],
    base: &Url,
    now: DateTime<Utc>,
) -> Result<FighterPage, AppError> {
    let record = records.first().ok_or_else(|| {
        AppError::ExtractionError(format!("No fighter record extracted from {source_url}"))
    })?;
    let name = text(record, "given_name")
        .or_else(|| text(record, "display_name"))
        .ok_or_else(|| {
            AppError::ExtractionError(format!("Fighter page {source_url} has no name"))
        })?;

    let pro_mma_record = text(record, "pro_mma_record").and_then(|r| normalize_record(&r));
    let profile = FighterProfile {
        source_url: source_url.to_string(),
        name,
        nickname: text(record, "nickname"),
        age: text(record, "age").and_then(|a| parse_int(&a)),
        date_of_birth: text(record, "date_of_birth").and_then(|d| parse_site_date(&d, now)),
        height: text(record, "height").and_then(|h| height_cm(&h)),
        weight_class: text(record, "weight_class"),
        last_weigh_in: text(record, "last_weigh_in").and_then(|w| weigh_in_kg(&w)),
        born: text(record, "born"),
        head_coach: text(record, "head_coach"),
        other_coaches: text(record, "other_coaches"),
        affiliation: text(record, "affiliation"),
        total_fights: pro_mma_record.as_deref().and_then(total_fights),
        pro_mma_record,
        current_streak: text(record, "current_streak"),
        last_fight_date: text(record, "last_fight_date").and_then(|d| parse_site_date(&d, now)),
        profile_img_url: link(record, "profile_img_url", base),
    };

    let history = list(record, "history")
        .filter_map(|row| {
            let event_url = link(row, "event_url", base)?;
            let opponent_url = link(row, "opponent_url", base)?;
            let (finish_by, finish_by_details) = split_finish(text(row, "finish").as_deref());
            Some(FightHistoryEntry {
                event_url,
                event_name: text(row, "event_name"),
                event_date: text(row, "event_date").and_then(|d| parse_site_date(&d, now)),
                opponent: FighterRef::new(
                    opponent_url,
                    text(row, "opponent_name").unwrap_or_else(|| "Unknown".into()),
                ),
                result: parse_result(text(row, "result").as_deref()),
                finish_by,
                finish_by_details,
            })
        })
        .collect();

    Ok(FighterPage { profile, history })
}

/// The opponent's view of a result.
pub fn opposite_result(result: &str) -> Option<String> {
    let lower = result.to_ascii_lowercase();
    let flipped = if lower.starts_with("win") {
        "Loss"
    } else if lower.starts_with("loss") {
        "Win"
    } else if lower.starts_with("draw") || lower.starts_with("nc") || lower.contains("no contest")
    {
        return Some(result.to_string());
    } else {
        return None;
    };
    Some(flipped.to_string())
}

impl FightHistoryEntry {
    /// Bout details with the page owner as fighter 1.
    pub fn details(&self) -> FightDetails {
        FightDetails {
            result_fighter_1: self.result.clone(),
            result_fighter_2: self.result.as_deref().and_then(opposite_result),
            finish_by: self.finish_by.clone(),
            finish_by_details: self.finish_by_details.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://www.tapology.com").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_absolutize() {
        let b = base();
        assert_eq!(
            absolutize(&b, "/fightcenter/events/1-ufc#card").as_deref(),
            Some("https://www.tapology.com/fightcenter/events/1-ufc")
        );
        assert_eq!(
            absolutize(&b, "https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert_eq!(absolutize(&b, "#top"), None);
        assert_eq!(absolutize(&b, "mailto:a@b.c"), None);
    }

    #[test]
    fn test_listing_entries() {
        let records = vec![rec(json!({
            "events": [
                {"url": "/fightcenter/events/100-ufc-300", "name": "UFC 300", "date": "Saturday 04.13.2024 at 10:00 PM ET"},
                {"name": "No link"},
                {"url": "/fightcenter/events/101-ufc-301", "date": "TBA"}
            ]
        }))];
        let entries = listing_entries(&records, &base(), now());
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].url,
            "https://www.tapology.com/fightcenter/events/100-ufc-300"
        );
        assert_eq!(
            entries[0].date,
            Some(Utc.with_ymd_and_hms(2024, 4, 14, 2, 0, 0).unwrap())
        );
        assert_eq!(entries[1].date, None);
    }

    #[test]
    fn test_event_page_mapping() {
        let url = "https://www.tapology.com/fightcenter/events/100-ufc-300";
        let records = vec![rec(json!({
            "name": " UFC 300: Pereira vs. Hill ",
            "datetime": "Saturday 04.13.2024 at 10:00 PM ET",
            "venue": "T-Mobile Arena",
            "mma_bouts": "13",
            "broadcast": "N/A",
            "fights": [
                {
                    "fighter_1_name": "Alex Pereira", "fighter_1_url": "/fightcenter/fighters/1-alex-pereira",
                    "fighter_2_name": "Jamahal Hill", "fighter_2_url": "/fightcenter/fighters/2-jamahal-hill",
                    "fighter_1_result": "Win", "fighter_2_result": "Loss",
                    "finish": "KO/TKO, Punches", "rounds": "5 x 5", "fight_type": "Main Event"
                },
                {"fighter_1_name": "TBA", "fighter_2_url": "/fightcenter/fighters/3"},
                {
                    "fighter_1_url": "/fightcenter/fighters/4", "fighter_2_url": "/fightcenter/fighters/5",
                    "fighter_1_result": "12-0"
                }
            ]
        }))];
        let page = event_page(url, &records, &base(), now()).unwrap();
        assert_eq!(page.event.name, "UFC 300: Pereira vs. Hill");
        assert_eq!(page.event.mma_bouts, Some(13));
        assert_eq!(page.event.broadcast, None);
        assert_eq!(page.fights.len(), 2);

        let main = &page.fights[0];
        assert_eq!(main.details.finish_by.as_deref(), Some("KO/TKO"));
        assert_eq!(main.details.finish_by_details.as_deref(), Some("Punches"));
        assert_eq!(main.details.rounds, Some(5));
        assert_eq!(main.details.minutes_per_round, Some(5));
        assert_eq!(main.details.bout_order, Some(1));

        let upcoming = &page.fights[1];
        assert_eq!(upcoming.details.result_fighter_1, None);
        assert_eq!(upcoming.details.bout_order, Some(3));
        assert_eq!(upcoming.fighter_1.name, "Unknown");
    }

    #[test]
    fn test_event_page_requires_name() {
        let err = event_page("u", &[rec(json!({"venue": "x"}))], &base(), now()).unwrap_err();
        assert!(matches!(err, AppError::ExtractionError(_)));
    }

    #[test]
    fn test_fighter_page_mapping() {
        let url = "https://www.tapology.com/fightcenter/fighters/1-jon-jones";
        let records = vec![rec(json!({
            "given_name": "Jonathan Dwight Jones",
            "display_name": "Jon Jones",
            "nickname": "Bones",
            "age": "37",
            "date_of_birth": "1987.07.19",
            "height": "6'4\" (193cm)",
            "last_weigh_in": "248 lbs",
            "pro_mma_record": "28-1-0, 1 NC",
            "last_fight_date": "Nov 16, 2024",
            "head_coach": "N/A",
            "history": [
                {
                    "event_url": "/fightcenter/events/9-ufc-309", "event_name": "UFC 309",
                    "event_date": "2024.11.16",
                    "opponent_url": "/fightcenter/fighters/7-stipe", "opponent_name": "Stipe Miocic",
                    "result": "Win", "finish": "KO/TKO, Spinning Back Kick"
                },
                {"event_url": "/fightcenter/events/10", "opponent_name": "No link"}
            ]
        }))];
        let page = fighter_page(url, &records, &base(), now()).unwrap();
        let p = &page.profile;
        assert_eq!(p.name, "Jonathan Dwight Jones");
        assert_eq!(p.age, Some(37));
        assert_eq!(p.date_of_birth, NaiveDate::from_ymd_opt(1987, 7, 19));
        assert_eq!(p.height.as_deref(), Some("193cm"));
        assert_eq!(p.last_weigh_in, Some(112.5));
        assert_eq!(p.pro_mma_record.as_deref(), Some("28-1-0-1"));
        assert_eq!(p.total_fights, Some(30));
        assert_eq!(p.last_fight_date, NaiveDate::from_ymd_opt(2024, 11, 16));
        assert_eq!(p.head_coach, None);

        assert_eq!(page.history.len(), 1);
        let h = &page.history[0];
        assert_eq!(h.opponent.name, "Stipe Miocic");
        let details = h.details();
        assert_eq!(details.result_fighter_1.as_deref(), Some("Win"));
        assert_eq!(details.result_fighter_2.as_deref(), Some("Loss"));
    }

    #[test]
    fn test_opposite_result() {
        assert_eq!(opposite_result("Win").as_deref(), Some("Loss"));
        assert_eq!(opposite_result("loss").as_deref(), Some("Win"));
        assert_eq!(opposite_result("Draw").as_deref(), Some("Draw"));
        assert_eq!(opposite_result("Cancelled"), None);
    }
}
