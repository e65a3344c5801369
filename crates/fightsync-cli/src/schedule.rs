use anyhow::{Context, Result};
use chrono::Utc;
use fightsync_core::traits::Fetcher;
use fightsync_core::{EventSyncDriver, FighterSyncDriver, RefreshPolicy, SyncReport, SyncWindow};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{Ctx, log_report, window_sync};

pub struct Crons {
    pub sync: String,
    pub fighters: String,
    pub live: String,
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Sync,
    Fighters,
    Live,
}

impl Task {
    fn name(self) -> &'static str {
        match self {
            Task::Sync => "sync",
            Task::Fighters => "fighters",
            Task::Live => "live",
        }
    }

    async fn run<F: Fetcher>(self, ctx: Ctx<F>) -> SyncReport {
        let now = Utc::now();
        let config = ctx.config().clone();
        match self {
            Task::Sync => {
                let window = SyncWindow::Around {
                    days: config.days_lookback,
                };
                window_sync(ctx, window, false, now).await
            }
            Task::Fighters => {
                let policy = RefreshPolicy::FlaggedOrRecent {
                    recent_days: config.recent_fight_days,
                };
                FighterSyncDriver::new(ctx).run(policy, now).await
            }
            Task::Live => {
                let window = SyncWindow::Live {
                    hours: config.live_window_hours,
                };
                EventSyncDriver::new(ctx).run(window, now).await
            }
        }
    }
}

/// Run the three syncs on their cron schedules until Ctrl-C.
///
/// Runs may overlap. Every write is an upsert on identity.
pub async fn run<F: Fetcher + 'static>(ctx: Ctx<F>, crons: Crons) -> Result<()> {
    let mut scheduler = JobScheduler::new().await.context("creating scheduler")?;

    for (cron, task) in [
        (&crons.sync, Task::Sync),
        (&crons.fighters, Task::Fighters),
        (&crons.live, Task::Live),
    ] {
        let ctx = ctx.clone();
        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let ctx = ctx.clone();
            Box::pin(async move {
                tracing::info!(task = task.name(), "Scheduled run starting");
                let report = task.run(ctx).await;
                log_report(&report);
            })
        })
        .with_context(|| format!("creating {} job for cron '{cron}'", task.name()))?;
        scheduler
            .add(job)
            .await
            .with_context(|| format!("adding {} job", task.name()))?;
        tracing::info!(task = task.name(), cron = %cron, "Scheduled");
    }

    scheduler.start().await.context("starting scheduler")?;
    tracing::info!("Scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Shutting down scheduler");
    scheduler.shutdown().await.context("stopping scheduler")?;
    Ok(())
}
