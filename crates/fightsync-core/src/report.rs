use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::reconcile::SyncAction;

/// Tally of what a run looked at and wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

impl EntityCounts {
    pub fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Create => self.created += 1,
            SyncAction::Update => self.updated += 1,
            SyncAction::Skip => self.skipped += 1,
        }
    }

    pub fn writes(&self) -> u32 {
        self.created + self.updated
    }

    fn merge(&mut self, other: &EntityCounts) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// An entity that could not be synced this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub url: String,
    pub error: String,
    pub retryable: bool,
    /// The database rejected or lost the write.
    pub storage: bool,
}

/// JSON summary printed by every `fightsync` command.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub listing_pages: u32,
    pub events_seen: u32,
    pub events: EntityCounts,
    pub fights: EntityCounts,
    pub fighters: EntityCounts,
    pub fighter_stubs_created: u32,
    pub event_stubs_created: u32,
    pub fighters_flagged: u32,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode: mode.into(),
            started_at: Utc::now(),
            finished_at: None,
            listing_pages: 0,
            events_seen: 0,
            events: EntityCounts::default(),
            fights: EntityCounts::default(),
            fighters: EntityCounts::default(),
            fighter_stubs_created: 0,
            event_stubs_created: 0,
            fighters_flagged: 0,
            failures: Vec::new(),
        }
    }

    pub fn fail(&mut self, url: &str, error: &AppError) {
        let storage = error.is_storage();
        if storage {
            tracing::error!(url = %url, error = %error, "Entity write failed");
        } else {
            tracing::warn!(url = %url, error = %error, "Entity sync failed");
        }
        self.failures.push(SyncFailure {
            url: url.to_string(),
            error: error.to_string(),
            retryable: error.is_retryable(),
            storage,
        });
    }

    /// Failures the database caused, as opposed to the site.
    pub fn storage_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.storage).count()
    }

    /// Fold a per-entity report into the run's report.
    pub fn absorb(&mut self, other: SyncReport) {
        self.listing_pages += other.listing_pages;
        self.events_seen += other.events_seen;
        self.events.merge(&other.events);
        self.fights.merge(&other.fights);
        self.fighters.merge(&other.fighters);
        self.fighter_stubs_created += other.fighter_stubs_created;
        self.event_stubs_created += other.event_stubs_created;
        self.fighters_flagged += other.fighters_flagged;
        self.failures.extend(other.failures);
    }

    /// Number of content writes (creates and updates, stubs included).
    pub fn total_writes(&self) -> u32 {
        self.events.writes()
            + self.fights.writes()
            + self.fighters.writes()
            + self.fighter_stubs_created
            + self.event_stubs_created
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}
