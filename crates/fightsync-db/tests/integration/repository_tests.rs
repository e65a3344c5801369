use chrono::{NaiveDate, TimeZone, Utc};
use fightsync_core::AppError;
use fightsync_core::models::{
    EventQuery, EventRecord, FightDetails, FighterProfile, FighterQuery, FighterRef, NewFight,
};
use fightsync_db::Database;

use crate::integration::common::setup_test_db;

fn event(slug: &str, promotion: &str, day: u32) -> EventRecord {
    EventRecord {
        source_url: format!("https://www.tapology.com/fightcenter/events/{slug}"),
        name: slug.to_uppercase(),
        datetime: Some(Utc.with_ymd_and_hms(2025, 6, day, 2, 0, 0).unwrap()),
        promotion: Some(promotion.to_string()),
        venue: Some("UFC APEX".into()),
        location: Some("Las Vegas, Nevada".into()),
        broadcast: None,
        mma_bouts: Some(12),
        img_url: None,
    }
}

fn fighter_ref(slug: &str) -> FighterRef {
    FighterRef::new(
        format!("https://www.tapology.com/fightcenter/fighters/{slug}"),
        slug.to_uppercase(),
    )
}

fn profile(slug: &str, weight_class: &str) -> FighterProfile {
    let mut profile = FighterProfile::stub(&fighter_ref(slug));
    profile.nickname = Some(format!("The {slug}"));
    profile.weight_class = Some(weight_class.to_string());
    profile.last_fight_date = NaiveDate::from_ymd_opt(2025, 5, 31);
    profile
}

fn bout(event_id: i64, a: i64, b: i64, order: i32, result_a: Option<&str>) -> NewFight {
    NewFight {
        event_id,
        fighter_1_id: a,
        fighter_2_id: b,
        details: FightDetails {
            result_fighter_1: result_a.map(String::from),
            result_fighter_2: result_a.map(|r| (if r == "Win" { "Loss" } else { "Win" }).to_string()),
            rounds: Some(3),
            minutes_per_round: Some(5),
            weight_class: Some("Lightweight".into()),
            bout_order: Some(order),
            ..FightDetails::default()
        },
        content_hash: format!("hash-{a}-{b}-{order}"),
    }
}

#[tokio::test]
async fn test_event_upsert_and_stub_share_identity() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).event_repo();
    let record = event("1-ufc-316", "UFC", 7);

    let id = repo.upsert(&record, "h1").await.unwrap();
    let ensured = repo
        .insert_stub(&EventRecord::stub(&record.source_url, None), "stub")
        .await
        .unwrap();
    assert_eq!(ensured.id, id);
    assert!(!ensured.created);

    // The stub did not clobber the full row.
    let stored = repo.find_by_url(&record.source_url).await.unwrap().unwrap();
    assert_eq!(stored.content_hash.as_deref(), Some("h1"));
    let full = repo.get(id).await.unwrap().unwrap();
    assert_eq!(full.record, record);

    let mut changed = record.clone();
    changed.venue = Some("T-Mobile Arena".into());
    assert_eq!(repo.upsert(&changed, "h2").await.unwrap(), id);
    assert_eq!(repo.get(id).await.unwrap().unwrap().record, changed);

    repo.clear_hash(id).await.unwrap();
    let cleared = repo.find_by_url(&record.source_url).await.unwrap().unwrap();
    assert!(cleared.content_hash.is_none());
}

#[tokio::test]
async fn test_event_list_filters_and_upcoming() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).event_repo();
    repo.upsert(&event("1-early", "UFC", 1), "a").await.unwrap();
    repo.upsert(&event("2-mid", "Bellator MMA", 10), "b").await.unwrap();
    repo.upsert(&event("3-late", "UFC", 20), "c").await.unwrap();
    repo.insert_stub(
        &EventRecord::stub("https://www.tapology.com/fightcenter/events/4-undated", None),
        "d",
    )
    .await
    .unwrap();

    let ufc = repo
        .list(&EventQuery {
            promotion: Some("ufc".into()),
            limit: 10,
            ..EventQuery::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = ufc.iter().map(|e| e.record.name.as_str()).collect();
    assert_eq!(names, ["3-LATE", "1-EARLY"]);

    let window = repo
        .list(&EventQuery {
            from: Some(Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap()),
            ascending: true,
            limit: 10,
            ..EventQuery::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = window.iter().map(|e| e.record.name.as_str()).collect();
    assert_eq!(names, ["2-MID", "3-LATE"]);

    let upcoming = repo
        .upcoming(Utc.with_ymd_and_hms(2025, 6, 9, 0, 0, 0).unwrap(), 10)
        .await
        .unwrap();
    let names: Vec<_> = upcoming.iter().map(|e| e.record.name.as_str()).collect();
    assert_eq!(names, ["2-MID", "3-LATE", "Unknown Event"]);
}

#[tokio::test]
async fn test_fighter_stub_is_promoted_in_place() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).fighter_repo();

    let stub = repo.insert_stub(&fighter_ref("a"), "stub").await.unwrap();
    assert!(stub.created);
    let again = repo.insert_stub(&fighter_ref("a"), "other").await.unwrap();
    assert_eq!(again, fightsync_core::models::Ensured { id: stub.id, created: false });

    let stored = repo.find_by_url(&fighter_ref("a").source_url).await.unwrap().unwrap();
    assert!(stored.needs_update);
    assert_eq!(stored.content_hash.as_deref(), Some("stub"));

    let id = repo.upsert(&profile("a", "Lightweight"), "full").await.unwrap();
    assert_eq!(id, stub.id);

    let fighter = repo.get(id).await.unwrap().unwrap();
    assert!(!fighter.needs_update);
    assert_eq!(fighter.profile.nickname.as_deref(), Some("The a"));

    let all = repo.list_stored().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].last_fight_date, NaiveDate::from_ymd_opt(2025, 5, 31));
}

#[tokio::test]
async fn test_set_needs_update_on_unknown_fighter_is_not_found() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).fighter_repo();

    let err = repo.set_needs_update(4242, true).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");

    let id = repo.upsert(&profile("b", "Welterweight"), "h").await.unwrap();
    repo.set_needs_update(id, true).await.unwrap();
    assert!(repo.get(id).await.unwrap().unwrap().needs_update);
}

#[tokio::test]
async fn test_fighter_list_matches_name_or_nickname() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).fighter_repo();
    repo.upsert(&profile("jones", "Heavyweight"), "1").await.unwrap();
    repo.upsert(&profile("miocic", "Heavyweight"), "2").await.unwrap();
    repo.upsert(&profile("makhachev", "Lightweight"), "3").await.unwrap();

    let by_name = repo
        .list(&FighterQuery {
            name: Some("MIO".into()),
            limit: 10,
            ..FighterQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].profile.name, "MIOCIC");

    let heavy = repo
        .list(&FighterQuery {
            weight_class: Some("heavyweight".into()),
            limit: 10,
            ..FighterQuery::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = heavy.iter().map(|f| f.profile.name.as_str()).collect();
    assert_eq!(names, ["JONES", "MIOCIC"]);

    let paged = repo
        .list(&FighterQuery {
            limit: 1,
            offset: 1,
            ..FighterQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(paged[0].profile.name, "MAKHACHEV");
}

#[tokio::test]
async fn test_fight_pair_is_unordered() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let event_id = db.event_repo().upsert(&event("1-card", "UFC", 7), "e").await.unwrap();
    let fighters = db.fighter_repo();
    let a = fighters.upsert(&profile("a", "Lightweight"), "a").await.unwrap();
    let b = fighters.upsert(&profile("b", "Lightweight"), "b").await.unwrap();
    let repo = db.fight_repo();

    let id = repo.upsert(&bout(event_id, a, b, 1, None)).await.unwrap();

    let found = repo.find(event_id, b, a).await.unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!((found.fighter_1_id, found.fighter_2_id), (a, b));

    assert!(!repo.insert_if_absent(&bout(event_id, b, a, 1, Some("Win"))).await.unwrap());

    // A later card listing the pair the other way round rewrites the same row.
    let again = repo.upsert(&bout(event_id, b, a, 1, Some("Win"))).await.unwrap();
    assert_eq!(again, id);
    let card = repo.card(event_id).await.unwrap();
    assert_eq!(card.len(), 1);
    assert_eq!(card[0].fighter_1.id, b);
    assert_eq!(card[0].details.result_fighter_1.as_deref(), Some("Win"));
}

#[tokio::test]
async fn test_self_matchup_is_rejected() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let event_id = db.event_repo().upsert(&event("1-card", "UFC", 7), "e").await.unwrap();
    let a = db.fighter_repo().upsert(&profile("a", "Lightweight"), "a").await.unwrap();

    let err = db.fight_repo().upsert(&bout(event_id, a, a, 1, None)).await.unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)), "{err}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_card_order_and_history_perspective() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let events = db.event_repo();
    let first = events.upsert(&event("1-first", "UFC", 1), "1").await.unwrap();
    let second = events.upsert(&event("2-second", "UFC", 20), "2").await.unwrap();
    let fighters = db.fighter_repo();
    let a = fighters.upsert(&profile("a", "Lightweight"), "a").await.unwrap();
    let b = fighters.upsert(&profile("b", "Lightweight"), "b").await.unwrap();
    let c = fighters.upsert(&profile("c", "Lightweight"), "c").await.unwrap();
    let fights = db.fight_repo();

    let mut unordered = bout(second, c, b, 0, None);
    unordered.details.bout_order = None;
    fights.upsert(&unordered).await.unwrap();
    fights.upsert(&bout(second, a, c, 2, None)).await.unwrap();
    fights.upsert(&bout(second, b, a, 1, None)).await.unwrap();
    fights.upsert(&bout(first, a, b, 1, Some("Win"))).await.unwrap();

    let card = fights.card(second).await.unwrap();
    let order: Vec<_> = card.iter().map(|f| f.details.bout_order).collect();
    assert_eq!(order, [Some(1), Some(2), None]);

    let history = fights.history(b).await.unwrap();
    assert_eq!(history.len(), 3);
    let last = history.last().unwrap();
    assert_eq!(last.event.id, first);
    assert_eq!(last.opponent.id, a);
    assert_eq!(last.result.as_deref(), Some("Loss"));
    assert_eq!(last.opponent_result.as_deref(), Some("Win"));
    assert!(history.iter().all(|h| h.opponent.id != b));
}
