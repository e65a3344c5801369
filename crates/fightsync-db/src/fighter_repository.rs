use chrono::{DateTime, NaiveDate, Utc};
use fightsync_core::error::AppError;
use fightsync_core::models::{Ensured, Fighter, FighterProfile, FighterQuery, FighterRef, StoredFighter};
use sqlx::PgPool;

use crate::error::db_error;

const FIGHTER_COLUMNS: &str = "id, source_url, name, nickname, age, date_of_birth, height, \
     weight_class, last_weigh_in, born, head_coach, other_coaches, affiliation, pro_mma_record, \
     current_streak, last_fight_date, total_fights, profile_img_url, needs_update, \
     created_at, updated_at";

/// Fighter rows, keyed by `source_url`.
#[derive(Clone)]
pub struct FighterRepository {
    pool: PgPool,
}

impl FighterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_url(&self, source_url: &str) -> Result<Option<StoredFighter>, AppError> {
        let row = sqlx::query_as::<_, StoredFighterRow>(
            r#"
            SELECT id, source_url, name, content_hash, needs_update, last_fight_date
            FROM fighters
            WHERE source_url = $1
            "#,
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    /// Insert or overwrite a full profile. The refresh flag is cleared.
    pub async fn upsert(
        &self,
        profile: &FighterProfile,
        content_hash: &str,
    ) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO fighters (source_url, name, nickname, age, date_of_birth, height,
                                  weight_class, last_weigh_in, born, head_coach, other_coaches,
                                  affiliation, pro_mma_record, current_streak, last_fight_date,
                                  total_fights, profile_img_url, content_hash, needs_update)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, FALSE)
            ON CONFLICT (source_url) DO UPDATE SET
                name = EXCLUDED.name,
                nickname = EXCLUDED.nickname,
                age = EXCLUDED.age,
                date_of_birth = EXCLUDED.date_of_birth,
                height = EXCLUDED.height,
                weight_class = EXCLUDED.weight_class,
                last_weigh_in = EXCLUDED.last_weigh_in,
                born = EXCLUDED.born,
                head_coach = EXCLUDED.head_coach,
                other_coaches = EXCLUDED.other_coaches,
                affiliation = EXCLUDED.affiliation,
                pro_mma_record = EXCLUDED.pro_mma_record,
                current_streak = EXCLUDED.current_streak,
                last_fight_date = EXCLUDED.last_fight_date,
                total_fights = EXCLUDED.total_fights,
                profile_img_url = EXCLUDED.profile_img_url,
                content_hash = EXCLUDED.content_hash,
                needs_update = FALSE,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&profile.source_url)
        .bind(&profile.name)
        .bind(&profile.nickname)
        .bind(profile.age)
        .bind(profile.date_of_birth)
        .bind(&profile.height)
        .bind(&profile.weight_class)
        .bind(profile.last_weigh_in)
        .bind(&profile.born)
        .bind(&profile.head_coach)
        .bind(&profile.other_coaches)
        .bind(&profile.affiliation)
        .bind(&profile.pro_mma_record)
        .bind(&profile.current_streak)
        .bind(profile.last_fight_date)
        .bind(profile.total_fights)
        .bind(&profile.profile_img_url)
        .bind(content_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.0)
    }

    /// Insert a name-only row flagged for refresh, unless the URL is known.
    pub async fn insert_stub(
        &self,
        fighter: &FighterRef,
        content_hash: &str,
    ) -> Result<Ensured, AppError> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO fighters (source_url, name, content_hash, needs_update)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (source_url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&fighter.source_url)
        .bind(&fighter.name)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some((id,)) = inserted {
            tracing::debug!(url = %fighter.source_url, id, "Inserted fighter stub");
            return Ok(Ensured { id, created: true });
        }
        let existing = self.find_by_url(&fighter.source_url).await?.ok_or_else(|| {
            AppError::DatabaseError(format!(
                "Fighter {} vanished after conflict",
                fighter.source_url
            ))
        })?;
        Ok(Ensured {
            id: existing.id,
            created: false,
        })
    }

    /// Set or clear the refresh flag. Leaves `updated_at` alone.
    pub async fn set_needs_update(&self, id: i64, needs_update: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE fighters SET needs_update = $2 WHERE id = $1")
            .bind(id)
            .bind(needs_update)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Fighter {id} not found")));
        }
        Ok(())
    }

    pub async fn clear_hash(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE fighters SET content_hash = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn list_stored(&self) -> Result<Vec<StoredFighter>, AppError> {
        let rows = sqlx::query_as::<_, StoredFighterRow>(
            r#"
            SELECT id, source_url, name, content_hash, needs_update, last_fight_date
            FROM fighters
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Fighter>, AppError> {
        let sql = format!("SELECT {FIGHTER_COLUMNS} FROM fighters WHERE id = $1");
        let row = sqlx::query_as::<_, FighterRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    /// Fighters by name, with optional name and weight-class filters.
    pub async fn list(&self, query: &FighterQuery) -> Result<Vec<Fighter>, AppError> {
        let sql = format!(
            r#"
            SELECT {FIGHTER_COLUMNS}
            FROM fighters
            WHERE ($1::text IS NULL
                   OR name ILIKE '%' || $1 || '%'
                   OR nickname ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR weight_class ILIKE $2)
            ORDER BY LOWER(name), id
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, FighterRow>(&sql)
            .bind(&query.name)
            .bind(&query.weight_class)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct StoredFighterRow {
    id: i64,
    source_url: String,
    name: String,
    content_hash: Option<String>,
    needs_update: bool,
    last_fight_date: Option<NaiveDate>,
}

impl From<StoredFighterRow> for StoredFighter {
    fn from(row: StoredFighterRow) -> Self {
        StoredFighter {
            id: row.id,
            source_url: row.source_url,
            name: row.name,
            content_hash: row.content_hash,
            needs_update: row.needs_update,
            last_fight_date: row.last_fight_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FighterRow {
    id: i64,
    source_url: String,
    name: String,
    nickname: Option<String>,
    age: Option<i32>,
    date_of_birth: Option<NaiveDate>,
    height: Option<String>,
    weight_class: Option<String>,
    last_weigh_in: Option<f64>,
    born: Option<String>,
    head_coach: Option<String>,
    other_coaches: Option<String>,
    affiliation: Option<String>,
    pro_mma_record: Option<String>,
    current_streak: Option<String>,
    last_fight_date: Option<NaiveDate>,
    total_fights: Option<i32>,
    profile_img_url: Option<String>,
    needs_update: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FighterRow> for Fighter {
    fn from(row: FighterRow) -> Self {
        Fighter {
            id: row.id,
            profile: FighterProfile {
                source_url: row.source_url,
                name: row.name,
                nickname: row.nickname,
                age: row.age,
                date_of_birth: row.date_of_birth,
                height: row.height,
                weight_class: row.weight_class,
                last_weigh_in: row.last_weigh_in,
                born: row.born,
                head_coach: row.head_coach,
                other_coaches: row.other_coaches,
                affiliation: row.affiliation,
                pro_mma_record: row.pro_mma_record,
                current_streak: row.current_streak,
                last_fight_date: row.last_fight_date,
                total_fights: row.total_fights,
                profile_img_url: row.profile_img_url,
            },
            needs_update: row.needs_update,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
