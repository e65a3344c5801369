use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fightsync_core::models::{
    CardFight, Event, EventSummary, Fighter, FighterSummary, HistoryFight,
};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct EventListQuery {
    /// Case-insensitive substring of the promotion name
    pub promotion: Option<String>,
    /// Only events starting at or after this instant (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Only events starting at or before this instant (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    /// `asc` or `desc` by start time (default `desc`)
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UpcomingQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    pub id: i64,
    pub source_url: String,
    pub name: String,
    pub datetime: Option<DateTime<Utc>>,
    pub promotion: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub broadcast: Option<String>,
    pub mma_bouts: Option<i32>,
    pub img_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            source_url: e.record.source_url,
            name: e.record.name,
            datetime: e.record.datetime,
            promotion: e.record.promotion,
            venue: e.record.venue,
            location: e.record.location,
            broadcast: e.record.broadcast,
            mma_bouts: e.record.mma_bouts,
            img_url: e.record.img_url,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// An event with its fight card in running order.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub fights: Vec<CardFightResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FighterRefResponse {
    pub id: i64,
    pub name: String,
    pub source_url: String,
}

impl From<FighterSummary> for FighterRefResponse {
    fn from(f: FighterSummary) -> Self {
        Self {
            id: f.id,
            name: f.name,
            source_url: f.source_url,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CardFightResponse {
    pub id: i64,
    pub fighter_1: FighterRefResponse,
    pub fighter_2: FighterRefResponse,
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

impl From<CardFight> for CardFightResponse {
    fn from(f: CardFight) -> Self {
        Self {
            id: f.id,
            fighter_1: f.fighter_1.into(),
            fighter_2: f.fighter_2.into(),
            result_fighter_1: f.details.result_fighter_1,
            result_fighter_2: f.details.result_fighter_2,
            finish_by: f.details.finish_by,
            finish_by_details: f.details.finish_by_details,
            rounds: f.details.rounds,
            minutes_per_round: f.details.minutes_per_round,
            fight_type: f.details.fight_type,
            weight_class: f.details.weight_class,
            bout_order: f.details.bout_order,
        }
    }
}

// ---------------------------------------------------------------------------
// Fighters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct FighterListQuery {
    /// Case-insensitive substring of the name or nickname
    pub name: Option<String>,
    /// Exact weight class, case-insensitive
    pub weight_class: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FighterResponse {
    pub id: i64,
    pub source_url: String,
    pub name: String,
    pub nickname: Option<String>,
    pub age: Option<i32>,
    pub date_of_birth: Option<NaiveDate>,
    pub height: Option<String>,
    pub weight_class: Option<String>,
    /// Kilograms
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
    /// True while the fighter is a stub or has been flagged for refresh
    pub needs_update: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Fighter> for FighterResponse {
    fn from(f: Fighter) -> Self {
        let p = f.profile;
        Self {
            id: f.id,
            source_url: p.source_url,
            name: p.name,
            nickname: p.nickname,
            age: p.age,
            date_of_birth: p.date_of_birth,
            height: p.height,
            weight_class: p.weight_class,
            last_weigh_in: p.last_weigh_in,
            born: p.born,
            head_coach: p.head_coach,
            other_coaches: p.other_coaches,
            affiliation: p.affiliation,
            pro_mma_record: p.pro_mma_record,
            current_streak: p.current_streak,
            last_fight_date: p.last_fight_date,
            total_fights: p.total_fights,
            profile_img_url: p.profile_img_url,
            needs_update: f.needs_update,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FighterListResponse {
    pub fighters: Vec<FighterResponse>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventRefResponse {
    pub id: i64,
    pub name: String,
    pub datetime: Option<DateTime<Utc>>,
    pub source_url: String,
}

impl From<EventSummary> for EventRefResponse {
    fn from(e: EventSummary) -> Self {
        Self {
            id: e.id,
            name: e.name,
            datetime: e.datetime,
            source_url: e.source_url,
        }
    }
}

/// One bout from the fighter's side: `result` is theirs.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HistoryFightResponse {
    pub id: i64,
    pub event: EventRefResponse,
    pub opponent: FighterRefResponse,
    pub result: Option<String>,
    pub opponent_result: Option<String>,
    pub finish_by: Option<String>,
    pub finish_by_details: Option<String>,
    pub rounds: Option<i32>,
    pub minutes_per_round: Option<i32>,
    pub weight_class: Option<String>,
}

impl From<HistoryFight> for HistoryFightResponse {
    fn from(h: HistoryFight) -> Self {
        Self {
            id: h.id,
            event: h.event.into(),
            opponent: h.opponent.into(),
            result: h.result,
            opponent_result: h.opponent_result,
            finish_by: h.finish_by,
            finish_by_details: h.finish_by_details,
            rounds: h.rounds,
            minutes_per_round: h.minutes_per_round,
            weight_class: h.weight_class,
        }
    }
}

/// A fighter with their stored fight history, most recent first.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FighterDetailResponse {
    #[serde(flatten)]
    pub fighter: FighterResponse,
    pub history: Vec<HistoryFightResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FlagResponse {
    pub id: i64,
    pub needs_update: bool,
}

// ---------------------------------------------------------------------------
// Sync triggers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LiveSyncQuery {
    /// Hours either side of now (default LIVE_WINDOW_HOURS, at most 48)
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LiveSyncResponse {
    pub status: &'static str,
    pub hours: i64,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
