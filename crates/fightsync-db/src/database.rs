use std::time::Duration;

use fightsync_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::error::db_error;
use crate::event_repository::EventRepository;
use crate::fight_repository::FightRepository;
use crate::fighter_repository::FighterRepository;
use crate::store::PgSyncStore;

/// Owns the connection pool, runs migrations and hands out repositories.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    pub fn event_repo(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }

    pub fn fighter_repo(&self) -> FighterRepository {
        FighterRepository::new(self.pool.clone())
    }

    pub fn fight_repo(&self) -> FightRepository {
        FightRepository::new(self.pool.clone())
    }

    /// The [`SyncStore`](fightsync_core::SyncStore) the sync drivers write through.
    pub fn sync_store(&self) -> PgSyncStore {
        PgSyncStore::new(self.event_repo(), self.fighter_repo(), self.fight_repo())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
