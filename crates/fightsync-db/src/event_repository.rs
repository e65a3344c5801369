use chrono::{DateTime, Utc};
use fightsync_core::error::AppError;
use fightsync_core::models::{Ensured, Event, EventQuery, EventRecord, StoredEvent};
use sqlx::PgPool;

use crate::error::db_error;

const EVENT_COLUMNS: &str = "id, source_url, name, datetime, promotion, venue, location, \
     broadcast, mma_bouts, img_url, created_at, updated_at";

/// Event rows, keyed by `source_url`.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_url(&self, source_url: &str) -> Result<Option<StoredEvent>, AppError> {
        let row: Option<(i64, String, Option<String>)> = sqlx::query_as(
            "SELECT id, source_url, content_hash FROM events WHERE source_url = $1",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(id, source_url, content_hash)| StoredEvent {
            id,
            source_url,
            content_hash,
        }))
    }

    /// Insert or fully overwrite the event with this `source_url`.
    pub async fn upsert(&self, event: &EventRecord, content_hash: &str) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO events (source_url, name, datetime, promotion, venue, location,
                                broadcast, mma_bouts, img_url, content_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_url) DO UPDATE SET
                name = EXCLUDED.name,
                datetime = EXCLUDED.datetime,
                promotion = EXCLUDED.promotion,
                venue = EXCLUDED.venue,
                location = EXCLUDED.location,
                broadcast = EXCLUDED.broadcast,
                mma_bouts = EXCLUDED.mma_bouts,
                img_url = EXCLUDED.img_url,
                content_hash = EXCLUDED.content_hash,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&event.source_url)
        .bind(&event.name)
        .bind(event.datetime)
        .bind(&event.promotion)
        .bind(&event.venue)
        .bind(&event.location)
        .bind(&event.broadcast)
        .bind(event.mma_bouts)
        .bind(&event.img_url)
        .bind(content_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.0)
    }

    /// Insert a minimal event unless one with this `source_url` exists.
    pub async fn insert_stub(
        &self,
        event: &EventRecord,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO events (source_url, name, datetime, content_hash)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&event.source_url)
        .bind(&event.name)
        .bind(event.datetime)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some((id,)) = inserted {
            return Ok(Ensured { id, created: true });
        }
        let existing = self.find_by_url(&event.source_url).await?.ok_or_else(|| {
            AppError::DatabaseError(format!("Event {} vanished after conflict", event.source_url))
        })?;
        Ok(Ensured {
            id: existing.id,
            created: false,
        })
    }

    pub async fn clear_hash(&self, event_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE events SET content_hash = NULL WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Event>, AppError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    pub async fn list(&self, query: &EventQuery) -> Result<Vec<Event>, AppError> {
        let order = if query.ascending {
            "datetime ASC NULLS LAST, id ASC"
        } else {
            "datetime DESC NULLS LAST, id DESC"
        };
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE ($1::text IS NULL OR promotion ILIKE '%' || $1 || '%')
              AND ($2::timestamptz IS NULL OR datetime >= $2)
              AND ($3::timestamptz IS NULL OR datetime <= $3)
            ORDER BY {order}
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(&query.promotion)
            .bind(query.from)
            .bind(query.to)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Events from `since` on, soonest first. Undated events come last.
    pub async fn upcoming(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Event>, AppError> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE datetime >= $1 OR datetime IS NULL
            ORDER BY datetime ASC NULLS LAST, id ASC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    source_url: String,
    name: String,
    datetime: Option<DateTime<Utc>>,
    promotion: Option<String>,
    venue: Option<String>,
    location: Option<String>,
    broadcast: Option<String>,
    mma_bouts: Option<i32>,
    img_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            record: EventRecord {
                source_url: row.source_url,
                name: row.name,
                datetime: row.datetime,
                promotion: row.promotion,
                venue: row.venue,
                location: row.location,
                broadcast: row.broadcast,
                mma_bouts: row.mma_bouts,
                img_url: row.img_url,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
