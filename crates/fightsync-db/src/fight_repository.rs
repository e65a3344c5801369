use chrono::{DateTime, Utc};
use fightsync_core::error::AppError;
use fightsync_core::models::{
    CardFight, EventSummary, FightDetails, FighterSummary, HistoryFight, NewFight, StoredFight,
};
use sqlx::PgPool;

use crate::error::db_error;

/// Fight rows. A bout is identified by its event and the unordered pair of
/// fighters, so (A, B) and (B, A) on the same card are the same row.
#[derive(Clone)]
pub struct FightRepository {
    pool: PgPool,
}

impl FightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        event_id: i64,
        fighter_a: i64,
        fighter_b: i64,
    ) -> Result<Option<StoredFight>, AppError> {
        let row: Option<(i64, i64, i64, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, event_id, fighter_1_id, fighter_2_id, content_hash
            FROM fights
            WHERE event_id = $1
              AND fighter_low_id = LEAST($2::bigint, $3::bigint)
              AND fighter_high_id = GREATEST($2::bigint, $3::bigint)
            "#,
        )
        .bind(event_id)
        .bind(fighter_a)
        .bind(fighter_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(
            |(id, event_id, fighter_1_id, fighter_2_id, content_hash)| StoredFight {
                id,
                event_id,
                fighter_1_id,
                fighter_2_id,
                content_hash,
            },
        ))
    }

    /// Insert or overwrite a bout. The incoming fighter order replaces the
    /// stored one, since results are positional.
    pub async fn upsert(&self, fight: &NewFight) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO fights (event_id, fighter_1_id, fighter_2_id, result_fighter_1,
                                result_fighter_2, finish_by, finish_by_details, rounds,
                                minutes_per_round, fight_type, weight_class, bout_order,
                                content_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (event_id, fighter_low_id, fighter_high_id) DO UPDATE SET
                fighter_1_id = EXCLUDED.fighter_1_id,
                fighter_2_id = EXCLUDED.fighter_2_id,
                result_fighter_1 = EXCLUDED.result_fighter_1,
                result_fighter_2 = EXCLUDED.result_fighter_2,
                finish_by = EXCLUDED.finish_by,
                finish_by_details = EXCLUDED.finish_by_details,
                rounds = EXCLUDED.rounds,
                minutes_per_round = EXCLUDED.minutes_per_round,
                fight_type = EXCLUDED.fight_type,
                weight_class = EXCLUDED.weight_class,
                bout_order = EXCLUDED.bout_order,
                content_hash = EXCLUDED.content_hash,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(fight.event_id)
        .bind(fight.fighter_1_id)
        .bind(fight.fighter_2_id)
        .bind(&fight.details.result_fighter_1)
        .bind(&fight.details.result_fighter_2)
        .bind(&fight.details.finish_by)
        .bind(&fight.details.finish_by_details)
        .bind(fight.details.rounds)
        .bind(fight.details.minutes_per_round)
        .bind(&fight.details.fight_type)
        .bind(&fight.details.weight_class)
        .bind(fight.details.bout_order)
        .bind(&fight.content_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.0)
    }

    /// Insert a bout unless the pair already fought on this event.
    /// Returns true when a row was inserted.
    pub async fn insert_if_absent(&self, fight: &NewFight) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO fights (event_id, fighter_1_id, fighter_2_id, result_fighter_1,
                                result_fighter_2, finish_by, finish_by_details, rounds,
                                minutes_per_round, fight_type, weight_class, bout_order,
                                content_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (event_id, fighter_low_id, fighter_high_id) DO NOTHING
            "#,
        )
        .bind(fight.event_id)
        .bind(fight.fighter_1_id)
        .bind(fight.fighter_2_id)
        .bind(&fight.details.result_fighter_1)
        .bind(&fight.details.result_fighter_2)
        .bind(&fight.details.finish_by)
        .bind(&fight.details.finish_by_details)
        .bind(fight.details.rounds)
        .bind(fight.details.minutes_per_round)
        .bind(&fight.details.fight_type)
        .bind(&fight.details.weight_class)
        .bind(fight.details.bout_order)
        .bind(&fight.content_hash)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// An event's bouts in card order; unordered bouts last.
    pub async fn card(&self, event_id: i64) -> Result<Vec<CardFight>, AppError> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT f.id,
                   f1.id AS f1_id, f1.name AS f1_name, f1.source_url AS f1_url,
                   f2.id AS f2_id, f2.name AS f2_name, f2.source_url AS f2_url,
                   f.result_fighter_1, f.result_fighter_2, f.finish_by, f.finish_by_details,
                   f.rounds, f.minutes_per_round, f.fight_type, f.weight_class, f.bout_order
            FROM fights f
            JOIN fighters f1 ON f1.id = f.fighter_1_id
            JOIN fighters f2 ON f2.id = f.fighter_2_id
            WHERE f.event_id = $1
            ORDER BY f.bout_order ASC NULLS LAST, f.id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A fighter's bouts, most recent event first, each seen from their side.
    pub async fn history(&self, fighter_id: i64) -> Result<Vec<HistoryFight>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT f.id,
                   e.id AS event_id, e.name AS event_name, e.datetime AS event_datetime,
                   e.source_url AS event_url,
                   o.id AS opponent_id, o.name AS opponent_name, o.source_url AS opponent_url,
                   CASE WHEN f.fighter_1_id = $1 THEN f.result_fighter_1
                        ELSE f.result_fighter_2 END AS result,
                   CASE WHEN f.fighter_1_id = $1 THEN f.result_fighter_2
                        ELSE f.result_fighter_1 END AS opponent_result,
                   f.finish_by, f.finish_by_details, f.rounds, f.minutes_per_round,
                   f.weight_class
            FROM fights f
            JOIN events e ON e.id = f.event_id
            JOIN fighters o ON o.id = CASE WHEN f.fighter_1_id = $1
                                           THEN f.fighter_2_id ELSE f.fighter_1_id END
            WHERE f.fighter_1_id = $1 OR f.fighter_2_id = $1
            ORDER BY e.datetime DESC NULLS LAST, f.id DESC
            "#,
        )
        .bind(fighter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CardRow {
    id: i64,
    f1_id: i64,
    f1_name: String,
    f1_url: String,
    f2_id: i64,
    f2_name: String,
    f2_url: String,
    result_fighter_1: Option<String>,
    result_fighter_2: Option<String>,
    finish_by: Option<String>,
    finish_by_details: Option<String>,
    rounds: Option<i32>,
    minutes_per_round: Option<i32>,
    fight_type: Option<String>,
    weight_class: Option<String>,
    bout_order: Option<i32>,
}

impl From<CardRow> for CardFight {
    fn from(row: CardRow) -> Self {
        CardFight {
            id: row.id,
            fighter_1: FighterSummary {
                id: row.f1_id,
                name: row.f1_name,
                source_url: row.f1_url,
            },
            fighter_2: FighterSummary {
                id: row.f2_id,
                name: row.f2_name,
                source_url: row.f2_url,
            },
            details: FightDetails {
                result_fighter_1: row.result_fighter_1,
                result_fighter_2: row.result_fighter_2,
                finish_by: row.finish_by,
                finish_by_details: row.finish_by_details,
                rounds: row.rounds,
                minutes_per_round: row.minutes_per_round,
                fight_type: row.fight_type,
                weight_class: row.weight_class,
                bout_order: row.bout_order,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    event_id: i64,
    event_name: String,
    event_datetime: Option<DateTime<Utc>>,
    event_url: String,
    opponent_id: i64,
    opponent_name: String,
    opponent_url: String,
    result: Option<String>,
    opponent_result: Option<String>,
    finish_by: Option<String>,
    finish_by_details: Option<String>,
    rounds: Option<i32>,
    minutes_per_round: Option<i32>,
    weight_class: Option<String>,
}

impl From<HistoryRow> for HistoryFight {
    fn from(row: HistoryRow) -> Self {
        HistoryFight {
            id: row.id,
            event: EventSummary {
                id: row.event_id,
                name: row.event_name,
                datetime: row.event_datetime,
                source_url: row.event_url,
            },
            opponent: FighterSummary {
                id: row.opponent_id,
                name: row.opponent_name,
                source_url: row.opponent_url,
            },
            result: row.result,
            opponent_result: row.opponent_result,
            finish_by: row.finish_by,
            finish_by_details: row.finish_by_details,
            rounds: row.rounds,
            minutes_per_round: row.minutes_per_round,
            weight_class: row.weight_class,
        }
    }
}
