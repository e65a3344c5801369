use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::context::SyncContext;
use crate::dates::eastern_to_utc;
use crate::error::AppError;
use crate::hash::{fight_hash, hash_of};
use crate::mapping::fighter_page;
use crate::models::{
    EventRecord, FightHistoryEntry, FightRecord, FighterRef, NewFight, StoredFighter,
};
use crate::policy::RefreshPolicy;
use crate::reconcile::{SyncAction, decide};
use crate::report::SyncReport;
use crate::traits::{Extractor, Fetcher, SyncStore};

/// Refreshes fighters picked by a [`RefreshPolicy`] and discovers the
/// opponents and events in their fight history.
pub struct FighterSyncDriver<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    ctx: SyncContext<F, E, S>,
}

impl<F, E, S> FighterSyncDriver<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    pub fn new(ctx: SyncContext<F, E, S>) -> Self {
        Self { ctx }
    }

    /// Sync every stored fighter the policy selects.
    pub async fn run(&self, policy: RefreshPolicy, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new("fighters");
        let span = tracing::info_span!("fighter_sync", run_id = %report.run_id, ?policy);

        async {
            let ctx = &self.ctx;
            let fighters = match ctx.retry.run("list_fighters", || ctx.store.list_fighters()).await {
                Ok(fighters) => fighters,
                Err(e) => {
                    report.fail("fighters", &e);
                    return;
                }
            };
            let selected: Vec<StoredFighter> = fighters
                .into_iter()
                .filter(|f| policy.selects(f, now))
                .collect();
            tracing::info!(fighters = selected.len(), "Selected fighters for refresh");

            let results: Vec<SyncReport> = stream::iter(selected)
                .map(|fighter| async move {
                    let url = fighter.source_url.clone();
                    self.sync_one(&url, Some(fighter), now).await
                })
                .buffer_unordered(ctx.config.concurrency)
                .collect()
                .await;
            for entity in results {
                report.absorb(entity);
            }

            tracing::info!(
                created = report.fighters.created,
                updated = report.fighters.updated,
                skipped = report.fighters.skipped,
                stubs = report.fighter_stubs_created,
                failures = report.failures.len(),
                "Fighter sync finished"
            );
        }
        .instrument(span)
        .await;

        report.finish()
    }

    /// Sync one fighter by URL, creating it when absent.
    pub async fn sync_fighter_url(&self, url: &str, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new("fighter");
        let span = tracing::info_span!("fighter_sync", run_id = %report.run_id, mode = "fighter");

        let entity = async {
            let ctx = &self.ctx;
            match ctx.retry.run("find_fighter", || ctx.store.find_fighter(url)).await {
                Ok(stored) => self.sync_one(url, stored, now).await,
                Err(e) => {
                    let mut failed = SyncReport::new("fighter");
                    failed.fail(url, &e);
                    failed
                }
            }
        }
        .instrument(span)
        .await;

        report.absorb(entity);
        report.finish()
    }

    async fn sync_one(
        &self,
        url: &str,
        stored: Option<StoredFighter>,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let mut report = SyncReport::new("fighter");
        if let Err(e) = self.reconcile_fighter(url, stored, now, &mut report).await {
            report.fail(url, &e);
        }
        report
    }

    async fn reconcile_fighter(
        &self,
        url: &str,
        stored: Option<StoredFighter>,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let ctx = &self.ctx;
        let records = ctx.load(url, &ctx.schemas.fighter).await?;
        let page = fighter_page(url, &records, &ctx.config.base_url, now)?;
        let hash = hash_of(&page.profile)?;

        let action = decide(stored.as_ref(), &hash);
        report.fighters.record(action);
        tracing::info!(url = %url, %action, history = page.history.len(), "Reconciled fighter");

        if action == SyncAction::Skip {
            // Bookkeeping only: the content is already current.
            if let Some(row) = stored.filter(|f| f.needs_update) {
                ctx.retry
                    .run("set_fighter_flag", || ctx.store.set_fighter_flag(row.id, false))
                    .await?;
            }
            return Ok(());
        }

        let fighter_id = ctx
            .retry
            .run("upsert_fighter", || ctx.store.upsert_fighter(&page.profile, &hash))
            .await?;

        let owner = FighterRef::new(&page.profile.source_url, &page.profile.name);
        let mut history_failed = false;
        for entry in &page.history {
            if let Err(e) = self.reconcile_history(fighter_id, &owner, entry, report).await {
                history_failed = true;
                report.fail(&entry.event_url, &e);
            }
        }

        // Keep the fighter selectable until its history is fully written.
        if history_failed {
            ctx.retry
                .run("clear_fighter_hash", || ctx.store.clear_fighter_hash(fighter_id))
                .await?;
        }
        Ok(())
    }

    /// Insert a history fight unless the event already has one for this pair.
    async fn reconcile_history(
        &self,
        fighter_id: i64,
        owner: &FighterRef,
        entry: &FightHistoryEntry,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let ctx = &self.ctx;
        if entry.opponent.source_url == owner.source_url {
            return Ok(());
        }

        let mut event = EventRecord::stub(&entry.event_url, entry.event_name.clone());
        event.datetime = entry
            .event_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(eastern_to_utc);
        let event_hash = hash_of(&event)?;
        let ensured = ctx
            .retry
            .run("ensure_event_stub", || ctx.store.ensure_event_stub(&event, &event_hash))
            .await?;
        if ensured.created {
            report.event_stubs_created += 1;
            tracing::info!(url = %entry.event_url, "Created event stub");
        }

        let opponent_id = ctx.ensure_fighter(&entry.opponent, report).await?;

        let details = entry.details();
        let hash = fight_hash(&FightRecord {
            fighter_1: owner.clone(),
            fighter_2: entry.opponent.clone(),
            details: details.clone(),
        })?;
        let new_fight = NewFight {
            event_id: ensured.id,
            fighter_1_id: fighter_id,
            fighter_2_id: opponent_id,
            details,
            content_hash: hash,
        };
        let inserted = ctx
            .retry
            .run("insert_fight", || ctx.store.insert_fight_if_absent(&new_fight))
            .await?;
        report.fights.record(if inserted {
            SyncAction::Create
        } else {
            SyncAction::Skip
        });
        Ok(())
    }
}
