use fightsync_core::error::AppError;
use fightsync_core::models::{
    Ensured, EventRecord, FighterProfile, FighterRef, NewFight, StoredEvent, StoredFight,
    StoredFighter,
};
use fightsync_core::traits::SyncStore;

use crate::event_repository::EventRepository;
use crate::fight_repository::FightRepository;
use crate::fighter_repository::FighterRepository;

/// PostgreSQL-backed [`SyncStore`].
///
/// Every write is a single statement keyed on a unique constraint, so
/// concurrent passes race safely without explicit transactions.
#[derive(Clone)]
pub struct PgSyncStore {
    events: EventRepository,
    fighters: FighterRepository,
    fights: FightRepository,
}

impl PgSyncStore {
    pub fn new(
        events: EventRepository,
        fighters: FighterRepository,
        fights: FightRepository,
    ) -> Self {
        Self {
            events,
            fighters,
            fights,
        }
    }
}

impl SyncStore for PgSyncStore {
    async fn find_event(&self, source_url: &str) -> Result<Option<StoredEvent>, AppError> {
        self.events.find_by_url(source_url).await
    }

    async fn upsert_event(&self, event: &EventRecord, content_hash: &str) -> Result<i64, AppError> {
        self.events.upsert(event, content_hash).await
    }

    async fn ensure_event_stub(
        &self,
        event: &EventRecord,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        self.events.insert_stub(event, content_hash).await
    }

    async fn clear_event_hash(&self, event_id: i64) -> Result<(), AppError> {
        self.events.clear_hash(event_id).await
    }

    async fn find_fighter(&self, source_url: &str) -> Result<Option<StoredFighter>, AppError> {
        self.fighters.find_by_url(source_url).await
    }

    async fn upsert_fighter(
        &self,
        profile: &FighterProfile,
        content_hash: &str,
    ) -> Result<i64, AppError> {
        self.fighters.upsert(profile, content_hash).await
    }

    async fn ensure_fighter_stub(
        &self,
        fighter: &FighterRef,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        self.fighters.insert_stub(fighter, content_hash).await
    }

    async fn set_fighter_flag(&self, fighter_id: i64, needs_update: bool) -> Result<(), AppError> {
        self.fighters.set_needs_update(fighter_id, needs_update).await
    }

    async fn clear_fighter_hash(&self, fighter_id: i64) -> Result<(), AppError> {
        self.fighters.clear_hash(fighter_id).await
    }

    async fn list_fighters(&self) -> Result<Vec<StoredFighter>, AppError> {
        self.fighters.list_stored().await
    }

    async fn find_fight(
        &self,
        event_id: i64,
        fighter_a: i64,
        fighter_b: i64,
    ) -> Result<Option<StoredFight>, AppError> {
        self.fights.find(event_id, fighter_a, fighter_b).await
    }

    async fn upsert_fight(&self, fight: &NewFight) -> Result<i64, AppError> {
        self.fights.upsert(fight).await
    }

    async fn insert_fight_if_absent(&self, fight: &NewFight) -> Result<bool, AppError> {
        self.fights.insert_if_absent(fight).await
    }
}
