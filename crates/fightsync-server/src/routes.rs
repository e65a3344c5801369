use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use chrono::{Duration, Utc};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fightsync_core::config::MAX_LIVE_HOURS;
use fightsync_core::error::AppError;
use fightsync_core::models::{EventQuery, FighterQuery};

use crate::auth::require_admin_token;
use crate::dto::{
    CardFightResponse, EventDetailResponse, EventListQuery, EventListResponse, EventResponse,
    FighterDetailResponse, FighterListQuery, FighterListResponse, FighterResponse, FlagResponse,
    HealthResponse, HistoryFightResponse, LiveSyncQuery, LiveSyncResponse, UpcomingQuery,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/v1/fighters/{id}/flag", post(flag_fighter))
        .route("/v1/sync/live", post(trigger_live_sync))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/v1/events", get(list_events))
        .route("/v1/events/upcoming", get(upcoming_events))
        .route("/v1/events/{id}", get(get_event))
        .route("/v1/fighters", get(list_fighters))
        .route("/v1/fighters/{id}", get(get_fighter))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(admin).with_state(state)
}

/// Resolve `limit`/`offset` query values to a bounded page.
fn page(limit: Option<i64>, offset: Option<i64>) -> Result<(i64, i64), ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::BadRequest("offset must not be negative".to_string()));
    }
    Ok((limit.min(MAX_LIMIT), offset))
}

fn ascending(order: Option<&str>) -> Result<bool, ApiError> {
    match order.map(str::to_ascii_lowercase).as_deref() {
        None | Some("desc") => Ok(false),
        Some("asc") => Ok(true),
        Some(other) => Err(ApiError::BadRequest(format!(
            "order must be 'asc' or 'desc', got '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventListQuery),
    responses(
        (status = 200, description = "Events, newest first unless order=asc", body = EventListResponse),
        (status = 400, description = "Bad query", body = crate::dto::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = page(query.limit, query.offset)?;
    let filter = EventQuery {
        promotion: query.promotion.filter(|p| !p.trim().is_empty()),
        from: query.from,
        to: query.to,
        ascending: ascending(query.order.as_deref())?,
        limit,
        offset,
    };

    let events = state.db.event_repo().list(&filter).await?;

    Ok(axum::Json(EventListResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
        limit,
        offset,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/events/upcoming",
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Events from yesterday on, soonest first; undated events last", body = EventListResponse),
        (status = 400, description = "Bad query", body = crate::dto::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn upcoming_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = page(query.limit, None)?;
    // A card that started yesterday evening may still be running.
    let since = Utc::now() - Duration::days(1);

    let events = state.db.event_repo().upcoming(since, limit).await?;

    Ok(axum::Json(EventListResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
        limit,
        offset,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/events/{id}",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event with its fight card", body = EventDetailResponse),
        (status = 404, description = "Event not found", body = crate::dto::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .db
        .event_repo()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
    let fights = state.db.fight_repo().card(id).await?;

    Ok(axum::Json(EventDetailResponse {
        event: event.into(),
        fights: fights.into_iter().map(CardFightResponse::from).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Fighters
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/fighters",
    params(FighterListQuery),
    responses(
        (status = 200, description = "Fighters in name order", body = FighterListResponse),
        (status = 400, description = "Bad query", body = crate::dto::ErrorResponse),
    ),
    tag = "fighters"
)]
pub async fn list_fighters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FighterListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = page(query.limit, query.offset)?;
    let filter = FighterQuery {
        name: query.name.filter(|n| !n.trim().is_empty()),
        weight_class: query.weight_class.filter(|w| !w.trim().is_empty()),
        limit,
        offset,
    };

    let fighters = state.db.fighter_repo().list(&filter).await?;

    Ok(axum::Json(FighterListResponse {
        fighters: fighters.into_iter().map(FighterResponse::from).collect(),
        limit,
        offset,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/fighters/{id}",
    params(
        ("id" = i64, Path, description = "Fighter ID")
    ),
    responses(
        (status = 200, description = "Fighter with fight history", body = FighterDetailResponse),
        (status = 404, description = "Fighter not found", body = crate::dto::ErrorResponse),
    ),
    tag = "fighters"
)]
pub async fn get_fighter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let fighter = state
        .db
        .fighter_repo()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fighter {id} not found")))?;
    let history = state.db.fight_repo().history(id).await?;

    Ok(axum::Json(FighterDetailResponse {
        fighter: fighter.into(),
        history: history
            .into_iter()
            .map(HistoryFightResponse::from)
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/fighters/{id}/flag",
    params(
        ("id" = i64, Path, description = "Fighter ID")
    ),
    responses(
        (status = 200, description = "Fighter queued for the next refresh", body = FlagResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Admin routes disabled", body = crate::dto::ErrorResponse),
        (status = 404, description = "Fighter not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn flag_fighter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.fighter_repo().set_needs_update(id, true).await?;
    tracing::info!(fighter_id = id, "Fighter flagged for refresh");

    Ok(axum::Json(FlagResponse {
        id,
        needs_update: true,
    }))
}

// ---------------------------------------------------------------------------
// Sync triggers
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/sync/live",
    params(LiveSyncQuery),
    responses(
        (status = 202, description = "Live check started", body = LiveSyncResponse),
        (status = 400, description = "Bad window", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 409, description = "A live check is already running", body = LiveSyncResponse),
        (status = 503, description = "Live checks unavailable", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn trigger_live_sync(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveSyncQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let live = state.live.as_ref().ok_or_else(|| {
        ApiError::Unavailable("Live checks are not configured on this server".to_string())
    })?;

    let hours = query.hours.unwrap_or_else(|| live.default_hours());
    if !(1..=MAX_LIVE_HOURS).contains(&hours) {
        return Err(ApiError::BadRequest(format!(
            "hours must be between 1 and {MAX_LIVE_HOURS}"
        )));
    }

    if live.trigger(hours) {
        tracing::info!(hours, "Live check triggered");
        let body = LiveSyncResponse {
            status: "started",
            hours,
        };
        Ok((StatusCode::ACCEPTED, axum::Json(body)))
    } else {
        let body = LiveSyncResponse {
            status: "already_running",
            hours,
        };
        Ok((StatusCode::CONFLICT, axum::Json(body)))
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = match state.db.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let (status, response) = if healthy {
        (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                database: "ok",
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "unhealthy",
                database: "error",
            },
        )
    };

    (status, axum::Json(response))
}
