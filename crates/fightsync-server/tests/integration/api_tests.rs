use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fightsync_core::models::{EventRecord, FightDetails, FighterProfile, FighterRef, NewFight};

use crate::integration::common::{
    TEST_ADMIN_TOKEN, TestApp, setup_test_app, setup_test_app_no_auth,
    setup_test_app_without_live,
};

const SITE: &str = "https://www.tapology.com/fightcenter";

struct Seeded {
    past_event: i64,
    jones: i64,
    miocic: i64,
}

/// One finished event with a single bout, one future event with no card.
async fn seed(app: &TestApp) -> Seeded {
    let events = app.db.event_repo();
    let past_event = events
        .upsert(
            &EventRecord {
                source_url: format!("{SITE}/events/1-ufc-309"),
                name: "UFC 309".into(),
                datetime: Some(Utc.with_ymd_and_hms(2024, 11, 17, 3, 0, 0).unwrap()),
                promotion: Some("UFC".into()),
                venue: Some("Madison Square Garden".into()),
                location: Some("New York, New York".into()),
                broadcast: None,
                mma_bouts: Some(12),
                img_url: None,
            },
            "past",
        )
        .await
        .unwrap();
    let mut future = EventRecord::stub(format!("{SITE}/events/2-ufc-400"), Some("UFC 400".into()));
    future.datetime = Some(Utc::now() + Duration::days(10));
    future.promotion = Some("UFC".into());
    events.upsert(&future, "future").await.unwrap();

    let fighters = app.db.fighter_repo();
    let mut jones = FighterProfile::stub(&FighterRef::new(
        format!("{SITE}/fighters/1-jon-jones"),
        "Jon Jones",
    ));
    jones.nickname = Some("Bones".into());
    jones.weight_class = Some("Heavyweight".into());
    let jones = fighters.upsert(&jones, "jones").await.unwrap();
    let miocic = FighterProfile::stub(&FighterRef::new(
        format!("{SITE}/fighters/2-stipe-miocic"),
        "Stipe Miocic",
    ));
    let miocic = fighters.upsert(&miocic, "miocic").await.unwrap();

    app.db
        .fight_repo()
        .upsert(&NewFight {
            event_id: past_event,
            fighter_1_id: jones,
            fighter_2_id: miocic,
            details: FightDetails {
                result_fighter_1: Some("Win".into()),
                result_fighter_2: Some("Loss".into()),
                finish_by: Some("KO/TKO".into()),
                rounds: Some(5),
                minutes_per_round: Some(5),
                weight_class: Some("Heavyweight".into()),
                bout_order: Some(1),
                ..FightDetails::default()
            },
            content_hash: "bout".into(),
        })
        .await
        .unwrap();

    Seeded {
        past_event,
        jones,
        miocic,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn admin_post(uri: &str, token: &str) -> Request<Body> {
    Request::post(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_event_list_orders_and_filters() {
    let app = setup_test_app().await;
    seed(&app).await;

    let (status, json) = send(&app, get("/v1/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 50);
    let names: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["UFC 400", "UFC 309"]);

    let (_, json) = send(&app, get("/v1/events?order=asc&limit=1")).await;
    assert_eq!(json["events"][0]["name"], "UFC 309");
    assert_eq!(json["events"].as_array().unwrap().len(), 1);

    let (_, json) = send(&app, get("/v1/events?promotion=bellator")).await;
    assert!(json["events"].as_array().unwrap().is_empty());

    let (status, json) = send(&app, get("/v1/events?order=sideways")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_upcoming_skips_finished_events() {
    let app = setup_test_app().await;
    seed(&app).await;

    let (status, json) = send(&app, get("/v1/events/upcoming")).await;

    assert_eq!(status, StatusCode::OK);
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["name"], "UFC 400");
}

#[tokio::test]
async fn test_event_detail_includes_card() {
    let app = setup_test_app().await;
    let seeded = seed(&app).await;

    let (status, json) = send(&app, get(&format!("/v1/events/{}", seeded.past_event))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "UFC 309");
    assert_eq!(json["venue"], "Madison Square Garden");
    let fights = json["fights"].as_array().unwrap();
    assert_eq!(fights.len(), 1);
    assert_eq!(fights[0]["fighter_1"]["name"], "Jon Jones");
    assert_eq!(fights[0]["result_fighter_1"], "Win");
    assert_eq!(fights[0]["finish_by"], "KO/TKO");
}

#[tokio::test]
async fn test_unknown_event_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/v1/events/999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_fighter_detail_shows_history_from_their_side() {
    let app = setup_test_app().await;
    let seeded = seed(&app).await;

    let (status, json) = send(&app, get(&format!("/v1/fighters/{}", seeded.miocic))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Stipe Miocic");
    let history = json["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["result"], "Loss");
    assert_eq!(history[0]["opponent_result"], "Win");
    assert_eq!(history[0]["opponent"]["id"], seeded.jones);
    assert_eq!(history[0]["event"]["name"], "UFC 309");
}

#[tokio::test]
async fn test_fighter_search_matches_nickname() {
    let app = setup_test_app().await;
    seed(&app).await;

    let (status, json) = send(&app, get("/v1/fighters?name=bones")).await;

    assert_eq!(status, StatusCode::OK);
    let fighters = json["fighters"].as_array().unwrap();
    assert_eq!(fighters.len(), 1);
    assert_eq!(fighters[0]["name"], "Jon Jones");
    assert_eq!(fighters[0]["needs_update"], false);
}

#[tokio::test]
async fn test_flag_requires_token() {
    let app = setup_test_app().await;
    let seeded = seed(&app).await;
    let uri = format!("/v1/fighters/{}/flag", seeded.jones);

    let (status, json) = send(&app, Request::post(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");

    let (status, _) = send(&app, admin_post(&uri, "wrong-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbidden_without_configured_token() {
    let app = setup_test_app_no_auth().await;

    let (status, json) = send(&app, admin_post("/v1/fighters/1/flag", "any-token")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn test_flag_marks_fighter_for_refresh() {
    let app = setup_test_app().await;
    let seeded = seed(&app).await;
    let uri = format!("/v1/fighters/{}/flag", seeded.jones);

    let (status, json) = send(&app, admin_post(&uri, TEST_ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["needs_update"], true);

    let stored = app.db.fighter_repo().get(seeded.jones).await.unwrap().unwrap();
    assert!(stored.needs_update);

    let (status, _) = send(&app, admin_post("/v1/fighters/999/flag", TEST_ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_sync_is_accepted() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, admin_post("/v1/sync/live?hours=2", TEST_ADMIN_TOKEN)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "started");
    assert_eq!(json["hours"], 2);
}

#[tokio::test]
async fn test_live_sync_rejects_bad_window() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, admin_post("/v1/sync/live?hours=0", TEST_ADMIN_TOKEN)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_live_sync_unavailable_without_runner() {
    let app = setup_test_app_without_live().await;

    let (status, json) = send(&app, admin_post("/v1/sync/live", TEST_ADMIN_TOKEN)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "unavailable");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/events/{id}"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer"].is_object());
}
