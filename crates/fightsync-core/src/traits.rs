use std::future::Future;

use crate::error::AppError;
use crate::models::{
    Ensured, EventRecord, FighterProfile, FighterRef, NewFight, Record, StoredEvent, StoredFight,
    StoredFighter,
};
use crate::schema::ExtractionSchema;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Applies a declarative schema to a page.
pub trait Extractor: Send + Sync + Clone {
    /// Returns one record per element matched by the schema's base selector.
    ///
    /// Fails with [`AppError::ExtractionError`] when the base selector matches
    /// nothing; missing fields are `null` (or their default) instead.
    fn extract(&self, html: &str, schema: &ExtractionSchema) -> Result<Vec<Record>, AppError>;
}

/// Identity-keyed persistence used by the sync drivers.
///
/// Every write is an upsert on the entity's stable identity, so two
/// concurrent passes that discover the same entity never insert it twice.
pub trait SyncStore: Send + Sync + Clone {
    // -- events --

    fn find_event(
        &self,
        source_url: &str,
    ) -> impl Future<Output = Result<Option<StoredEvent>, AppError>> + Send;

    /// Insert or overwrite an event by `source_url`. Returns the row id.
    fn upsert_event(
        &self,
        event: &EventRecord,
        content_hash: &str,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Insert a name-only event if no row exists for `source_url`.
    fn ensure_event_stub(
        &self,
        event: &EventRecord,
        content_hash: &str,
    ) -> impl Future<Output = Result<Ensured, AppError>> + Send;

    /// Forget an event's stored hash so the next run reconciles it again.
    fn clear_event_hash(&self, event_id: i64) -> impl Future<Output = Result<(), AppError>> + Send;

    // -- fighters --

    fn find_fighter(
        &self,
        source_url: &str,
    ) -> impl Future<Output = Result<Option<StoredFighter>, AppError>> + Send;

    /// Insert or overwrite a fighter by `source_url` and clear its refresh flag.
    fn upsert_fighter(
        &self,
        profile: &FighterProfile,
        content_hash: &str,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Insert a stub (`needs_update = true`) if no row exists for the reference.
    fn ensure_fighter_stub(
        &self,
        fighter: &FighterRef,
        content_hash: &str,
    ) -> impl Future<Output = Result<Ensured, AppError>> + Send;

    fn set_fighter_flag(
        &self,
        fighter_id: i64,
        needs_update: bool,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Forget a fighter's stored hash so the next pass reconciles it again.
    fn clear_fighter_hash(
        &self,
        fighter_id: i64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Lightweight projection of every fighter, for refresh selection.
    fn list_fighters(&self) -> impl Future<Output = Result<Vec<StoredFighter>, AppError>> + Send;

    // -- fights --

    /// Find a fight by event and unordered fighter pair.
    fn find_fight(
        &self,
        event_id: i64,
        fighter_a: i64,
        fighter_b: i64,
    ) -> impl Future<Output = Result<Option<StoredFight>, AppError>> + Send;

    /// Insert or overwrite a fight by (event, unordered pair). Returns the row id.
    fn upsert_fight(&self, fight: &NewFight) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Insert a fight unless one exists for (event, unordered pair).
    /// Returns true when a row was inserted.
    fn insert_fight_if_absent(
        &self,
        fight: &NewFight,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;
}
