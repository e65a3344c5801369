use serde::Serialize;

use crate::models::{StoredEvent, StoredFight, StoredFighter};

/// What the reconciler decided to do with one scraped entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// No row with this identity: insert it.
    Create,
    /// Row exists but its stored hash differs (or is missing): overwrite.
    Update,
    /// Row exists with the same hash: no write.
    Skip,
}

/// Anything stored with a content hash.
pub trait Hashed {
    fn content_hash(&self) -> Option<&str>;
}

impl Hashed for StoredEvent {
    fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }
}

impl Hashed for StoredFighter {
    fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }
}

impl Hashed for StoredFight {
    fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }
}

/// Decide CREATE / UPDATE / SKIP from the stored row (if any) and the fresh hash.
pub fn decide<S: Hashed>(stored: Option<&S>, fresh_hash: &str) -> SyncAction {
    match stored {
        None => SyncAction::Create,
        Some(row) if row.content_hash() == Some(fresh_hash) => SyncAction::Skip,
        Some(_) => SyncAction::Update,
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Create => write!(f, "create"),
            SyncAction::Update => write!(f, "update"),
            SyncAction::Skip => write!(f, "skip"),
        }
    }
}
