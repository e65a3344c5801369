use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use fightsync_client::{CssExtractor, ReqwestFetcher};
use fightsync_core::{EventSyncDriver, SyncContext, SyncWindow};
use fightsync_db::PgSyncStore;

pub type LiveContext = SyncContext<ReqwestFetcher, CssExtractor, PgSyncStore>;

/// Runs on-demand live checks in the background, one at a time.
#[derive(Clone)]
pub struct LiveSync {
    ctx: LiveContext,
    running: Arc<AtomicBool>,
}

impl LiveSync {
    pub fn new(ctx: LiveContext) -> Self {
        Self {
            ctx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Window used when the caller does not pick one.
    pub fn default_hours(&self) -> i64 {
        self.ctx.config().live_window_hours
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start a live check over `hours` either side of now.
    ///
    /// Returns false without starting anything when a check is already running.
    pub fn trigger(&self, hours: i64) -> bool {
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }

        let guard = RunningGuard(self.running.clone());
        let driver = EventSyncDriver::new(self.ctx.clone());
        tokio::spawn(async move {
            let _guard = guard;
            let report = driver.run(SyncWindow::Live { hours }, Utc::now()).await;
            tracing::info!(
                run_id = %report.run_id,
                writes = report.total_writes(),
                failures = report.failures.len(),
                "Live check finished"
            );
        });
        true
    }
}

/// Clears the running flag even if the check panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
