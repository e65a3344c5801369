//! Test utilities: in-memory implementations of the core traits.
//!
//! `MockFetcher` and `MockExtractor` serve canned pages keyed by URL;
//! `MemoryStore` keeps rows in memory and records every write so tests can
//! assert exactly what a sync run changed.
//!
//! Fetches and fighter lookups yield to the scheduler before answering, so
//! concurrently polled syncs interleave the way they do against real I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{
    Ensured, EventRecord, FightDetails, FighterProfile, FighterRef, NewFight, Record, StoredEvent,
    StoredFight, StoredFighter,
};
use crate::schema::{ExtractionSchema, SchemaSet};
use crate::traits::{Extractor, Fetcher, SyncStore};

// ---------------------------------------------------------------------------
// MockFetcher / MockExtractor
// ---------------------------------------------------------------------------

/// Serves canned HTML per URL. Unknown URLs answer `HTTP 404`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
        self
    }

    /// Every fetch of `url` fails with a network error.
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(msg) = self.failures.lock().unwrap().get(url) {
            return Err(AppError::NetworkError(msg.clone()));
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

/// Returns canned records keyed by (schema name, page body).
///
/// A page with no entry behaves like a page whose base selector matched nothing.
#[derive(Clone, Default)]
pub struct MockExtractor {
    records: Arc<Mutex<HashMap<(String, String), Vec<Record>>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, schema: &str, html: &str, records: Vec<Record>) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert((schema.to_string(), html.to_string()), records);
        self
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, html: &str, schema: &ExtractionSchema) -> Result<Vec<Record>, AppError> {
        self.records
            .lock()
            .unwrap()
            .get(&(schema.name.clone(), html.to_string()))
            .cloned()
            .ok_or_else(|| {
                AppError::ExtractionError(format!(
                    "Base selector '{}' matched nothing",
                    schema.base_selector
                ))
            })
    }
}

/// A fake website: each registered URL serves its own URL as the body and
/// extracts to the given record under the given schema.
#[derive(Clone, Default)]
pub struct MockSite {
    fetcher: MockFetcher,
    extractor: MockExtractor,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a page.
    pub fn page(&self, url: &str, schema: &str, record: serde_json::Value) -> &Self {
        let record = record.as_object().cloned().unwrap_or_default();
        self.fetcher
            .pages
            .lock()
            .unwrap()
            .insert(url.to_string(), url.to_string());
        self.extractor
            .records
            .lock()
            .unwrap()
            .insert((schema.to_string(), url.to_string()), vec![record]);
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.fetcher
            .failures
            .lock()
            .unwrap()
            .insert(url.to_string(), "connection reset".to_string());
        self
    }

    pub fn fetcher(&self) -> MockFetcher {
        self.fetcher.clone()
    }

    pub fn extractor(&self) -> MockExtractor {
        self.extractor.clone()
    }
}

/// Empty schemas with the shipped names, for use with [`MockExtractor`].
pub fn test_schemas() -> SchemaSet {
    let schema = |name: &str| ExtractionSchema {
        name: name.to_string(),
        base_selector: "body".to_string(),
        fields: Vec::new(),
    };
    SchemaSet {
        listing: schema("event_listing"),
        event: schema("event_detail"),
        fighter: schema("fighter_detail"),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// One recorded write against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    EventInsert(String),
    EventUpdate(String),
    EventStubInsert(String),
    EventHashCleared(i64),
    FighterInsert(String),
    FighterUpdate(String),
    FighterStubInsert(String),
    FighterHashCleared(i64),
    FlagSet { fighter_id: i64, needs_update: bool },
    FightInsert { event_id: i64, pair: (i64, i64) },
    FightUpdate { event_id: i64, pair: (i64, i64) },
}

#[derive(Debug, Clone)]
pub struct MemEvent {
    pub id: i64,
    pub record: EventRecord,
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemFighter {
    pub id: i64,
    pub profile: FighterProfile,
    pub content_hash: Option<String>,
    pub needs_update: bool,
}

#[derive(Debug, Clone)]
pub struct MemFight {
    pub id: i64,
    pub event_id: i64,
    pub fighter_1_id: i64,
    pub fighter_2_id: i64,
    pub details: FightDetails,
    pub content_hash: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    events: Vec<MemEvent>,
    fighters: Vec<MemFighter>,
    fights: Vec<MemFight>,
    writes: Vec<Write>,
    failing_fight_writes: usize,
    stub_conflicts: usize,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn fight_index(&self, event_id: i64, a: i64, b: i64) -> Option<usize> {
        let pair = unordered(a, b);
        self.fights.iter().position(|f| {
            f.event_id == event_id && unordered(f.fighter_1_id, f.fighter_2_id) == pair
        })
    }

    fn take_fight_failure(&mut self) -> Result<(), AppError> {
        if self.failing_fight_writes > 0 {
            self.failing_fight_writes -= 1;
            return Err(AppError::DatabaseError("injected fight write failure".into()));
        }
        Ok(())
    }
}

fn unordered(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// In-memory [`SyncStore`] with identity-keyed upserts and a write log.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully scraped fighter directly, bypassing the write log.
    pub fn seed_fighter(&self, profile: FighterProfile, hash: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.fighters.push(MemFighter {
            id,
            profile,
            content_hash: Some(hash.to_string()),
            needs_update: false,
        });
        id
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    pub fn events(&self) -> Vec<MemEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fighters(&self) -> Vec<MemFighter> {
        self.state.lock().unwrap().fighters.clone()
    }

    pub fn fights(&self) -> Vec<MemFight> {
        self.state.lock().unwrap().fights.clone()
    }

    pub fn fighter(&self, source_url: &str) -> Option<MemFighter> {
        self.fighters()
            .into_iter()
            .find(|f| f.profile.source_url == source_url)
    }

    /// Stub inserts that found the row already created by a concurrent caller.
    pub fn stub_conflicts(&self) -> usize {
        self.state.lock().unwrap().stub_conflicts
    }

    /// Make the next `n` fight writes fail with a permanent database error.
    pub fn fail_fight_writes(&self, n: usize) {
        self.state.lock().unwrap().failing_fight_writes = n;
    }
}

fn stored_fighter(f: &MemFighter) -> StoredFighter {
    StoredFighter {
        id: f.id,
        source_url: f.profile.source_url.clone(),
        name: f.profile.name.clone(),
        content_hash: f.content_hash.clone(),
        needs_update: f.needs_update,
        last_fight_date: f.profile.last_fight_date,
    }
}

impl SyncStore for MemoryStore {
    async fn find_event(&self, source_url: &str) -> Result<Option<StoredEvent>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .find(|e| e.record.source_url == source_url)
            .map(|e| StoredEvent {
                id: e.id,
                source_url: e.record.source_url.clone(),
                content_hash: e.content_hash.clone(),
            }))
    }

    async fn upsert_event(&self, event: &EventRecord, content_hash: &str) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        let url = event.source_url.clone();
        if let Some(row) = state.events.iter_mut().find(|e| e.record.source_url == url) {
            row.record = event.clone();
            row.content_hash = Some(content_hash.to_string());
            let id = row.id;
            state.writes.push(Write::EventUpdate(url));
            return Ok(id);
        }
        let id = state.next_id();
        state.events.push(MemEvent {
            id,
            record: event.clone(),
            content_hash: Some(content_hash.to_string()),
        });
        state.writes.push(Write::EventInsert(url));
        Ok(id)
    }

    async fn ensure_event_stub(
        &self,
        event: &EventRecord,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state
            .events
            .iter()
            .find(|e| e.record.source_url == event.source_url)
        {
            return Ok(Ensured {
                id: row.id,
                created: false,
            });
        }
        let id = state.next_id();
        state.events.push(MemEvent {
            id,
            record: event.clone(),
            content_hash: Some(content_hash.to_string()),
        });
        state
            .writes
            .push(Write::EventStubInsert(event.source_url.clone()));
        Ok(Ensured { id, created: true })
    }

    async fn clear_event_hash(&self, event_id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.events.iter_mut().find(|e| e.id == event_id) {
            row.content_hash = None;
        }
        state.writes.push(Write::EventHashCleared(event_id));
        Ok(())
    }

    async fn find_fighter(&self, source_url: &str) -> Result<Option<StoredFighter>, AppError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        Ok(state
            .fighters
            .iter()
            .find(|f| f.profile.source_url == source_url)
            .map(stored_fighter))
    }

    async fn upsert_fighter(
        &self,
        profile: &FighterProfile,
        content_hash: &str,
    ) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        let url = profile.source_url.clone();
        if let Some(row) = state
            .fighters
            .iter_mut()
            .find(|f| f.profile.source_url == url)
        {
            row.profile = profile.clone();
            row.content_hash = Some(content_hash.to_string());
            row.needs_update = false;
            let id = row.id;
            state.writes.push(Write::FighterUpdate(url));
            return Ok(id);
        }
        let id = state.next_id();
        state.fighters.push(MemFighter {
            id,
            profile: profile.clone(),
            content_hash: Some(content_hash.to_string()),
            needs_update: false,
        });
        state.writes.push(Write::FighterInsert(url));
        Ok(id)
    }

    async fn ensure_fighter_stub(
        &self,
        fighter: &FighterRef,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state
            .fighters
            .iter()
            .find(|f| f.profile.source_url == fighter.source_url)
            .map(|f| f.id)
        {
            state.stub_conflicts += 1;
            return Ok(Ensured { id, created: false });
        }
        let id = state.next_id();
        state.fighters.push(MemFighter {
            id,
            profile: FighterProfile::stub(fighter),
            content_hash: Some(content_hash.to_string()),
            needs_update: true,
        });
        state
            .writes
            .push(Write::FighterStubInsert(fighter.source_url.clone()));
        Ok(Ensured { id, created: true })
    }

    async fn set_fighter_flag(&self, fighter_id: i64, needs_update: bool) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .fighters
            .iter_mut()
            .find(|f| f.id == fighter_id)
            .ok_or_else(|| AppError::NotFound(format!("fighter {fighter_id}")))?;
        row.needs_update = needs_update;
        state.writes.push(Write::FlagSet {
            fighter_id,
            needs_update,
        });
        Ok(())
    }

    async fn clear_fighter_hash(&self, fighter_id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.fighters.iter_mut().find(|f| f.id == fighter_id) {
            row.content_hash = None;
        }
        state.writes.push(Write::FighterHashCleared(fighter_id));
        Ok(())
    }

    async fn list_fighters(&self) -> Result<Vec<StoredFighter>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.fighters.iter().map(stored_fighter).collect())
    }

    async fn find_fight(
        &self,
        event_id: i64,
        fighter_a: i64,
        fighter_b: i64,
    ) -> Result<Option<StoredFight>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .fight_index(event_id, fighter_a, fighter_b)
            .map(|idx| {
                let f = &state.fights[idx];
                StoredFight {
                    id: f.id,
                    event_id: f.event_id,
                    fighter_1_id: f.fighter_1_id,
                    fighter_2_id: f.fighter_2_id,
                    content_hash: f.content_hash.clone(),
                }
            }))
    }

    async fn upsert_fight(&self, fight: &NewFight) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        state.take_fight_failure()?;
        let pair = unordered(fight.fighter_1_id, fight.fighter_2_id);
        if let Some(idx) = state.fight_index(fight.event_id, fight.fighter_1_id, fight.fighter_2_id)
        {
            let row = &mut state.fights[idx];
            row.fighter_1_id = fight.fighter_1_id;
            row.fighter_2_id = fight.fighter_2_id;
            row.details = fight.details.clone();
            row.content_hash = Some(fight.content_hash.clone());
            let id = row.id;
            state.writes.push(Write::FightUpdate {
                event_id: fight.event_id,
                pair,
            });
            return Ok(id);
        }
        let id = state.next_id();
        state.fights.push(MemFight {
            id,
            event_id: fight.event_id,
            fighter_1_id: fight.fighter_1_id,
            fighter_2_id: fight.fighter_2_id,
            details: fight.details.clone(),
            content_hash: Some(fight.content_hash.clone()),
        });
        state.writes.push(Write::FightInsert {
            event_id: fight.event_id,
            pair,
        });
        Ok(id)
    }

    async fn insert_fight_if_absent(&self, fight: &NewFight) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.take_fight_failure()?;
        if state
            .fight_index(fight.event_id, fight.fighter_1_id, fight.fighter_2_id)
            .is_some()
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.fights.push(MemFight {
            id,
            event_id: fight.event_id,
            fighter_1_id: fight.fighter_1_id,
            fighter_2_id: fight.fighter_2_id,
            details: fight.details.clone(),
            content_hash: Some(fight.content_hash.clone()),
        });
        state.writes.push(Write::FightInsert {
            event_id: fight.event_id,
            pair: unordered(fight.fighter_1_id, fight.fighter_2_id),
        });
        Ok(true)
    }
}
