use chrono::{DateTime, TimeZone, Utc};
use fightsync_core::models::FighterRef;
use fightsync_core::testutil::{MockExtractor, MockFetcher, MockSite, test_schemas};
use fightsync_core::{
    EventSyncDriver, FighterSyncDriver, RefreshPolicy, RetryPolicy, SyncConfig, SyncContext,
    SyncStore,
};
use fightsync_db::{Database, PgSyncStore};
use serde_json::{Value, json};
use url::Url;

use crate::integration::common::setup_test_db;

const BASE: &str = "https://www.tapology.com";

type Ctx = SyncContext<MockFetcher, MockExtractor, PgSyncStore>;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn event_url(slug: &str) -> String {
    format!("{BASE}/fightcenter/events/{slug}")
}

fn fighter_url(slug: &str) -> String {
    format!("{BASE}/fightcenter/fighters/{slug}")
}

fn bout(a: &str, b: &str, result: Option<&str>) -> Value {
    json!({
        "fighter_1_name": a.to_uppercase(),
        "fighter_1_url": format!("/fightcenter/fighters/{a}"),
        "fighter_2_name": b.to_uppercase(),
        "fighter_2_url": format!("/fightcenter/fighters/{b}"),
        "fighter_1_result": result,
        "rounds": "3 x 5"
    })
}

fn card(fights: Vec<Value>) -> Value {
    json!({
        "name": "Fight Night",
        "datetime": "Saturday 05.31.2025 at 10:00 PM ET",
        "venue": "UFC APEX",
        "fights": fights
    })
}

fn ctx(site: &MockSite, db: &Database) -> Ctx {
    SyncContext::new(
        site.fetcher(),
        site.extractor(),
        db.sync_store(),
        test_schemas(),
        SyncConfig::new(Url::parse(BASE).unwrap()),
    )
    .with_retry(RetryPolicy::immediate(2))
}

async fn count(db: &Database, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap();
    n
}

#[tokio::test]
async fn test_concurrent_stub_inserts_create_one_row() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let store = db.sync_store();
    let fighter = FighterRef::new(fighter_url("9-shared"), "Shared Opponent");

    let (a, b, c) = tokio::join!(
        store.ensure_fighter_stub(&fighter, "stub"),
        store.ensure_fighter_stub(&fighter, "stub"),
        store.ensure_fighter_stub(&fighter, "stub"),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(a.id, b.id);
    assert_eq!(b.id, c.id);
    assert_eq!([a.created, b.created, c.created].iter().filter(|created| **created).count(), 1);
    assert_eq!(count(&db, "fighters").await, 1);
    let row = db.fighter_repo().get(a.id).await.unwrap().unwrap();
    assert!(row.needs_update);
}

#[tokio::test]
async fn test_event_sync_writes_once_then_settles() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let site = MockSite::new();
    let url = event_url("1-fight-night");
    site.page(
        &url,
        "event_detail",
        card(vec![bout("a", "b", None), bout("c", "b", None)]),
    );
    let driver = EventSyncDriver::new(ctx(&site, &db));

    let report = driver.sync_event(&url, now()).await;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.events.created, 1);
    assert_eq!(report.fighter_stubs_created, 3);
    assert_eq!(report.fights.created, 2);
    assert_eq!(count(&db, "fighters").await, 3);
    assert_eq!(count(&db, "fights").await, 2);

    let again = driver.sync_event(&url, now()).await;
    assert!(again.failures.is_empty(), "{:?}", again.failures);
    assert_eq!(again.events.skipped, 1);
    assert_eq!(again.total_writes(), 0);

    let event = db.event_repo().find_by_url(&url).await.unwrap().unwrap();
    let bouts = db.fight_repo().card(event.id).await.unwrap();
    assert_eq!(bouts[0].fighter_1.name, "A");
    assert_eq!(bouts[1].fighter_2.source_url, fighter_url("b"));
}

#[tokio::test]
async fn test_result_change_flags_both_fighters_in_postgres() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let site = MockSite::new();
    let url = event_url("1-fight-night");
    site.page(&url, "event_detail", card(vec![bout("a", "b", None)]));
    let events = EventSyncDriver::new(ctx(&site, &db));
    events.sync_event(&url, now()).await;

    // Bring both fighters up to date so the flags start cleared.
    let fighters = db.fighter_repo();
    for slug in ["a", "b"] {
        let stored = fighters.find_by_url(&fighter_url(slug)).await.unwrap().unwrap();
        fighters.set_needs_update(stored.id, false).await.unwrap();
    }

    site.page(&url, "event_detail", card(vec![bout("a", "b", Some("Win"))]));
    let report = events.sync_event(&url, now()).await;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.fights.updated, 1);
    assert_eq!(report.fighters_flagged, 2);

    for slug in ["a", "b"] {
        let stored = fighters.find_by_url(&fighter_url(slug)).await.unwrap().unwrap();
        assert!(stored.needs_update, "{slug} should be flagged");
    }
    let event = db.event_repo().find_by_url(&url).await.unwrap().unwrap();
    let bouts = db.fight_repo().card(event.id).await.unwrap();
    assert_eq!(bouts[0].details.result_fighter_1.as_deref(), Some("Win"));
}

#[tokio::test]
async fn test_fighter_pass_promotes_stubs_without_duplicating_fights() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let site = MockSite::new();
    let url = event_url("1-fight-night");
    site.page(&url, "event_detail", card(vec![bout("a", "b", Some("Win"))]));
    EventSyncDriver::new(ctx(&site, &db))
        .sync_event(&url, now())
        .await;

    // "b" lists the same bout from their side, plus an older one.
    site.page(
        &fighter_url("b"),
        "fighter_detail",
        json!({
            "display_name": "B",
            "pro_mma_record": "5-1-0",
            "last_fight_date": "2025.05.31",
            "history": [
                {
                    "event_url": "/fightcenter/events/1-fight-night",
                    "event_name": "Fight Night",
                    "event_date": "2025.05.31",
                    "opponent_url": "/fightcenter/fighters/a",
                    "opponent_name": "A",
                    "result": "Loss"
                },
                {
                    "event_url": "/fightcenter/events/0-older",
                    "event_name": "Older Event",
                    "event_date": "2024.12.14",
                    "opponent_url": "/fightcenter/fighters/d",
                    "opponent_name": "D",
                    "result": "Win"
                }
            ]
        }),
    );
    site.page(
        &fighter_url("a"),
        "fighter_detail",
        json!({"display_name": "A", "history": []}),
    );
    let fighters = FighterSyncDriver::new(ctx(&site, &db));

    let b_id = db
        .fighter_repo()
        .find_by_url(&fighter_url("b"))
        .await
        .unwrap()
        .unwrap()
        .id;
    let report = fighters.sync_fighter_url(&fighter_url("b"), now()).await;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.fighters.updated, 1);
    assert_eq!(report.fights.created, 1);
    assert_eq!(report.fights.skipped, 1);
    assert_eq!(report.event_stubs_created, 1);
    assert_eq!(report.fighter_stubs_created, 1);

    let promoted = db.fighter_repo().get(b_id).await.unwrap().unwrap();
    assert!(!promoted.needs_update);
    assert_eq!(promoted.profile.pro_mma_record.as_deref(), Some("5-1-0"));
    assert_eq!(count(&db, "fights").await, 2);
    assert_eq!(count(&db, "events").await, 2);

    // "d" still has no page; the next pass reports it and retries later.
    let pass = fighters.run(RefreshPolicy::default(), now()).await;
    assert_eq!(pass.failures.len(), 1);
    assert_eq!(pass.failures[0].url, fighter_url("d"));

    let settled = fighters.run(RefreshPolicy::default(), now()).await;
    assert_eq!(settled.total_writes(), 0);
}
