use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::context::SyncContext;
use crate::error::AppError;
use crate::hash::{event_page_hash, fight_hash};
use crate::listing::{SyncWindow, scan_listing};
use crate::mapping::event_page;
use crate::models::{FightRecord, NewFight};
use crate::reconcile::{SyncAction, decide};
use crate::report::SyncReport;
use crate::traits::{Extractor, Fetcher, SyncStore};

/// Scrapes a window of events and reconciles each one with its fight card.
pub struct EventSyncDriver<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    ctx: SyncContext<F, E, S>,
}

impl<F, E, S> EventSyncDriver<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    pub fn new(ctx: SyncContext<F, E, S>) -> Self {
        Self { ctx }
    }

    /// List the events in `window` and sync them with bounded concurrency.
    pub async fn run(&self, window: SyncWindow, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new(window.name());
        let span = tracing::info_span!("event_sync", run_id = %report.run_id, mode = window.name());

        async {
            let entries = scan_listing(&self.ctx, window, now, &mut report).await;
            tracing::info!(events = entries.len(), ?window, "Listing scanned");

            let results: Vec<SyncReport> = stream::iter(entries)
                .map(|entry| async move { self.sync_one(&entry.url, now).await })
                .buffer_unordered(self.ctx.config.concurrency)
                .collect()
                .await;
            for entity in results {
                report.absorb(entity);
            }

            tracing::info!(
                created = report.events.created,
                updated = report.events.updated,
                skipped = report.events.skipped,
                failures = report.failures.len(),
                "Event sync finished"
            );
        }
        .instrument(span)
        .await;

        report.finish()
    }

    /// Refresh a single event by URL, whether or not it is in any window.
    pub async fn sync_event(&self, url: &str, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new("event");
        let span = tracing::info_span!("event_sync", run_id = %report.run_id, mode = "event");
        let entity = self.sync_one(url, now).instrument(span).await;
        report.events_seen = 1;
        report.absorb(entity);
        report.finish()
    }

    async fn sync_one(&self, url: &str, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new("event");
        if let Err(e) = self.reconcile_event(url, now, &mut report).await {
            report.fail(url, &e);
        }
        report
    }

    async fn reconcile_event(
        &self,
        url: &str,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let ctx = &self.ctx;
        let records = ctx.load(url, &ctx.schemas.event).await?;
        let page = event_page(url, &records, &ctx.config.base_url, now)?;
        let hash = event_page_hash(&page)?;

        let stored = ctx.retry.run("find_event", || ctx.store.find_event(url)).await?;
        let action = decide(stored.as_ref(), &hash);
        report.events.record(action);
        tracing::info!(url = %url, %action, fights = page.fights.len(), "Reconciled event");
        if action == SyncAction::Skip {
            return Ok(());
        }

        let event_id = ctx
            .retry
            .run("upsert_event", || ctx.store.upsert_event(&page.event, &hash))
            .await?;

        let mut card_failed = false;
        for fight in &page.fights {
            if let Err(e) = self.reconcile_fight(event_id, fight, report).await {
                card_failed = true;
                report.fail(
                    &format!(
                        "{url} ({} vs {})",
                        fight.fighter_1.source_url, fight.fighter_2.source_url
                    ),
                    &e,
                );
            }
        }

        // The event hash covers the card, so a partly written card must not
        // look up to date on the next run.
        if card_failed {
            ctx.retry
                .run("clear_event_hash", || ctx.store.clear_event_hash(event_id))
                .await?;
        }
        Ok(())
    }

    async fn reconcile_fight(
        &self,
        event_id: i64,
        fight: &FightRecord,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let ctx = &self.ctx;
        if fight.is_self_matchup() {
            tracing::warn!(
                url = %fight.fighter_1.source_url,
                "Skipping card row with the same fighter on both sides"
            );
            return Ok(());
        }

        let fighter_1_id = ctx.ensure_fighter(&fight.fighter_1, report).await?;
        let fighter_2_id = ctx.ensure_fighter(&fight.fighter_2, report).await?;
        let hash = fight_hash(fight)?;

        let stored = ctx
            .retry
            .run("find_fight", || {
                ctx.store.find_fight(event_id, fighter_1_id, fighter_2_id)
            })
            .await?;
        let action = decide(stored.as_ref(), &hash);
        report.fights.record(action);
        tracing::debug!(
            event_id,
            fighter_1_id,
            fighter_2_id,
            %action,
            "Reconciled fight"
        );
        if action == SyncAction::Skip {
            return Ok(());
        }

        let new_fight = NewFight {
            event_id,
            fighter_1_id,
            fighter_2_id,
            details: fight.details.clone(),
            content_hash: hash,
        };
        ctx.retry
            .run("upsert_fight", || ctx.store.upsert_fight(&new_fight))
            .await?;

        // Results changed: both records (wins, streak, last fight) are stale now.
        if action == SyncAction::Update {
            for fighter_id in [fighter_1_id, fighter_2_id] {
                ctx.retry
                    .run("set_fighter_flag", || ctx.store.set_fighter_flag(fighter_id, true))
                    .await?;
                report.fighters_flagged += 1;
            }
        }
        Ok(())
    }
}
