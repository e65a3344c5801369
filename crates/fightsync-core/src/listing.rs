use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::context::SyncContext;
use crate::mapping::listing_entries;
use crate::models::ListingEntry;
use crate::report::SyncReport;
use crate::traits::{Extractor, Fetcher, SyncStore};

/// Which slice of the promotion's events a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWindow {
    /// `days` before and after now.
    Around { days: i64 },
    /// Everything from today on.
    Upcoming,
    /// Every listing page from `start_page` until an empty page.
    All { start_page: u32 },
    /// First listing page only, events starting within `hours` of now.
    Live { hours: i64 },
}

impl SyncWindow {
    pub fn name(&self) -> &'static str {
        match self {
            SyncWindow::Around { .. } => "window",
            SyncWindow::Upcoming => "upcoming",
            SyncWindow::All { .. } => "sweep",
            SyncWindow::Live { .. } => "live",
        }
    }

    fn start_page(&self) -> u32 {
        match self {
            SyncWindow::All { start_page } => (*start_page).max(1),
            _ => 1,
        }
    }

    /// Inclusive lower and upper bounds; `None` means unbounded.
    pub fn bounds(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match *self {
            SyncWindow::Around { days } => around(now, TimeDelta::try_days(days)),
            SyncWindow::Upcoming => (Some(now - TimeDelta::days(1)), None),
            SyncWindow::All { .. } => (None, None),
            SyncWindow::Live { hours } => around(now, TimeDelta::try_hours(hours)),
        }
    }

    /// Whether a listing entry belongs to this window. Undated entries
    /// (date not announced) count as upcoming.
    pub fn contains(&self, date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self, date) {
            (SyncWindow::All { .. }, _) => true,
            (SyncWindow::Upcoming, None) => true,
            (_, None) => false,
            (_, Some(date)) => {
                let (lo, hi) = self.bounds(now);
                lo.is_none_or(|lo| date >= lo) && hi.is_none_or(|hi| date <= hi)
            }
        }
    }
}

/// `now` plus and minus `span`. A side past the representable range is open.
fn around(
    now: DateTime<Utc>,
    span: Option<TimeDelta>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match span {
        Some(span) => (now.checked_sub_signed(span), now.checked_add_signed(span)),
        None => (None, None),
    }
}

/// Page through the promotion listing and collect the events in `window`.
///
/// Stops on an empty page, on a fetch or extraction failure, at
/// `max_listing_pages`, or (for bounded windows) once a page past the
/// first has nothing in range and only events older than the window.
pub async fn scan_listing<F, E, S>(
    ctx: &SyncContext<F, E, S>,
    window: SyncWindow,
    now: DateTime<Utc>,
    report: &mut SyncReport,
) -> Vec<ListingEntry>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    let mut promotion_url = match ctx.config.promotion_url() {
        Ok(url) => url,
        Err(e) => {
            report.fail(&ctx.config.promotion_path, &e);
            return Vec::new();
        }
    };
    let (lower, _) = window.bounds(now);
    let first_page = window.start_page();
    let last_page = match window {
        SyncWindow::Live { .. } => first_page,
        _ => first_page.saturating_add(ctx.config.max_listing_pages.saturating_sub(1)),
    };

    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for page in first_page..=last_page {
        promotion_url.set_query(Some(&format!("page={page}")));
        let url = promotion_url.as_str().to_string();

        let records = match ctx.load(&url, &ctx.schemas.listing).await {
            Ok(records) => records,
            Err(e) => {
                report.fail(&url, &e);
                break;
            }
        };
        report.listing_pages += 1;

        let entries = listing_entries(&records, &ctx.config.base_url, now);
        if entries.is_empty() {
            tracing::info!(page, "Empty listing page, stopping");
            break;
        }

        let newest = entries.iter().filter_map(|e| e.date).max();
        let mut in_window = 0;
        for entry in entries {
            if window.contains(entry.date, now) {
                in_window += 1;
                if seen.insert(entry.url.clone()) {
                    selected.push(entry);
                }
            }
        }
        tracing::debug!(page, in_window, "Scanned listing page");

        if page > first_page
            && in_window == 0
            && let (Some(lower), Some(newest)) = (lower, newest)
            && newest < lower
        {
            tracing::info!(page, "Listing is past the window, stopping");
            break;
        }
    }

    report.events_seen += selected.len() as u32;
    selected
}
