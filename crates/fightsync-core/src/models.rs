use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A flat or nested record produced by the field extractor.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Reference to a fighter as it appears on someone else's page
/// (fight card row, fight history row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FighterRef {
    /// Absolute source URL; the fighter's stable identity.
    pub source_url: String,
    pub name: String,
}

/// Event header fields scraped from an event detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub source_url: String,
    pub name: String,
    pub datetime: Option<DateTime<Utc>>,
    pub promotion: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub broadcast: Option<String>,
    pub mma_bouts: Option<i32>,
    pub img_url: Option<String>,
}

/// Result and format details of a single bout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FightDetails {
    pub result_fighter_1: Option<String>,
    pub result_fighter_2: Option<String>,
    pub finish_by: Option<String>,
    pub finish_by_details: Option<String>,
    pub rounds: Option<i32>,
    pub minutes_per_round: Option<i32>,
    pub fight_type: Option<String>,
    pub weight_class: Option<String>,
    pub bout_order: Option<i32>,
}

/// A fight-card row: both fighters in display order plus bout details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightRecord {
    pub fighter_1: FighterRef,
    pub fighter_2: FighterRef,
    #[serde(flatten)]
    pub details: FightDetails,
}

/// Everything extracted from one event detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub event: EventRecord,
    pub fights: Vec<FightRecord>,
}

/// Basic fields scraped from a fighter detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterProfile {
    pub source_url: String,
    pub name: String,
    pub nickname: Option<String>,
    pub age: Option<i32>,
    pub date_of_birth: Option<NaiveDate>,
    pub height: Option<String>,
    pub weight_class: Option<String>,
    /// Last weigh-in, in kilograms.
    pub last_weigh_in: Option<f64>,
    pub born: Option<String>,
    pub head_coach: Option<String>,
    pub other_coaches: Option<String>,
    pub affiliation: Option<String>,
    pub pro_mma_record: Option<String>,
    pub current_streak: Option<String>,
    pub last_fight_date: Option<NaiveDate>,
    pub total_fights: Option<i32>,
    pub profile_img_url: Option<String>,
}

/// One row of a fighter's fight history, seen from that fighter's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightHistoryEntry {
    pub event_url: String,
    pub event_name: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub opponent: FighterRef,
    pub result: Option<String>,
    pub finish_by: Option<String>,
    pub finish_by_details: Option<String>,
}

/// Everything extracted from one fighter detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct FighterPage {
    pub profile: FighterProfile,
    pub history: Vec<FightHistoryEntry>,
}

/// One entry of the promotion's event listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

// -- Stored projections (what the reconciler needs to know about existing rows) --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    pub source_url: String,
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFighter {
    pub id: i64,
    pub source_url: String,
    pub name: String,
    pub content_hash: Option<String>,
    pub needs_update: bool,
    pub last_fight_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFight {
    pub id: i64,
    pub event_id: i64,
    pub fighter_1_id: i64,
    pub fighter_2_id: i64,
    pub content_hash: Option<String>,
}

/// DTO for writing a fight row once both fighter identities are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFight {
    pub event_id: i64,
    pub fighter_1_id: i64,
    pub fighter_2_id: i64,
    pub details: FightDetails,
    pub content_hash: String,
}

/// Outcome of ensuring a stub row exists for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ensured {
    pub id: i64,
    /// True when this call inserted the row.
    pub created: bool,
}

// -- Read models (rows as the API shows them) --

/// A stored event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: i64,
    #[serde(flatten)]
    pub record: EventRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored fighter, possibly still a stub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fighter {
    pub id: i64,
    #[serde(flatten)]
    pub profile: FighterProfile,
    pub needs_update: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FighterSummary {
    pub id: i64,
    pub name: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: i64,
    pub name: String,
    pub datetime: Option<DateTime<Utc>>,
    pub source_url: String,
}

/// One bout of an event's card, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardFight {
    pub id: i64,
    pub fighter_1: FighterSummary,
    pub fighter_2: FighterSummary,
    #[serde(flatten)]
    pub details: FightDetails,
}

/// One bout from a fighter's point of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryFight {
    pub id: i64,
    pub event: EventSummary,
    pub opponent: FighterSummary,
    pub result: Option<String>,
    pub opponent_result: Option<String>,
    pub finish_by: Option<String>,
    pub finish_by_details: Option<String>,
    pub rounds: Option<i32>,
    pub minutes_per_round: Option<i32>,
    pub weight_class: Option<String>,
}

/// Filters for listing events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Case-insensitive substring match on the promotion.
    pub promotion: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Oldest first when true; newest first otherwise.
    pub ascending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Filters for listing fighters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FighterQuery {
    /// Case-insensitive substring match on name or nickname.
    pub name: Option<String>,
    pub weight_class: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl FighterRef {
    pub fn new(source_url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            name: name.into(),
        }
    }
}

impl FighterProfile {
    /// A profile carrying only identity and name, i.e. what a stub row holds.
    pub fn stub(fighter: &FighterRef) -> Self {
        Self {
            source_url: fighter.source_url.clone(),
            name: fighter.name.clone(),
            nickname: None,
            age: None,
            date_of_birth: None,
            height: None,
            weight_class: None,
            last_weigh_in: None,
            born: None,
            head_coach: None,
            other_coaches: None,
            affiliation: None,
            pro_mma_record: None,
            current_streak: None,
            last_fight_date: None,
            total_fights: None,
            profile_img_url: None,
        }
    }
}

impl EventRecord {
    /// An event known only by URL and name, seen from a fighter's history.
    pub fn stub(source_url: impl Into<String>, name: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            name: name.unwrap_or_else(|| "Unknown Event".to_string()),
            datetime: None,
            promotion: None,
            venue: None,
            location: None,
            broadcast: None,
            mma_bouts: None,
            img_url: None,
        }
    }
}

impl FightRecord {
    /// Both sides refer to the same fighter (bad markup or a placeholder row).
    pub fn is_self_matchup(&self) -> bool {
        self.fighter_1.source_url == self.fighter_2.source_url
    }
}
