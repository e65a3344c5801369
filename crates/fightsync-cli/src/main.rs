mod schedule;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use fightsync_client::{CssExtractor, ReqwestFetcher};
use fightsync_core::config::{MAX_DAYS, MAX_LIVE_HOURS};
use fightsync_core::traits::Fetcher;
use fightsync_core::{
    EventSyncDriver, FighterSyncDriver, RefreshPolicy, SchemaSet, SyncConfig, SyncContext,
    SyncReport, SyncWindow,
};
use fightsync_db::{Database, DatabaseConfig, PgSyncStore};

/// Sync context as wired by the binary: real extractor and Postgres store,
/// with the fetcher chosen at startup.
pub(crate) type Ctx<F> = SyncContext<F, CssExtractor, PgSyncStore>;

#[derive(Parser)]
#[command(
    name = "fightsync",
    version,
    about = "Keep a Postgres copy of a promotion's events, fights and fighters in sync"
)]
struct Cli {
    /// Render pages in headless Chromium instead of fetching plain HTML
    #[cfg(feature = "browser")]
    #[arg(long, global = true, env = "FIGHTSYNC_BROWSER", default_value_t = false)]
    browser: bool,

    /// CSS selector the browser waits for before reading a page
    #[cfg(feature = "browser")]
    #[arg(
        long,
        global = true,
        env = "FIGHTSYNC_BROWSER_WAIT_FOR",
        default_value = "body"
    )]
    wait_for: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the whole event listing and sync every event found
    Sweep {
        /// Listing page to start from (resume an interrupted sweep)
        #[arg(long, default_value_t = 1)]
        start_page: u32,
    },

    /// Sync events around now, then refresh flagged and recent fighters
    Sync {
        /// Days before and after now (defaults to DAYS_LOOKBACK)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_DAYS))]
        days: Option<i64>,

        /// Sync every upcoming event instead of a window around now
        #[arg(long, conflicts_with = "days")]
        upcoming: bool,

        /// Skip the fighter refresh pass
        #[arg(long, default_value_t = false)]
        skip_fighters: bool,
    },

    /// Check events starting or running within a few hours of now
    Live {
        /// Hours before and after now (defaults to LIVE_WINDOW_HOURS)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_LIVE_HOURS))]
        hours: Option<i64>,
    },

    /// Refresh fighters that are flagged, never scraped, or fought recently
    Fighters {
        /// Refresh every stored fighter
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Refresh one event by URL
    Event {
        /// Event page URL, absolute or relative to FIGHTSYNC_BASE_URL
        #[arg(short, long)]
        url: String,
    },

    /// Refresh one fighter by URL
    Fighter {
        /// Fighter page URL, absolute or relative to FIGHTSYNC_BASE_URL
        #[arg(short, long)]
        url: String,
    },

    /// Run the window sync, fighter refresh and live check on cron schedules
    Schedule {
        /// Window sync schedule (six-field cron, seconds first)
        #[arg(long, env = "FIGHTSYNC_CRON_SYNC", default_value = "0 0 */6 * * *")]
        sync_cron: String,

        /// Fighter refresh schedule
        #[arg(long, env = "FIGHTSYNC_CRON_FIGHTERS", default_value = "0 30 4 * * *")]
        fighters_cron: String,

        /// Live check schedule
        #[arg(long, env = "FIGHTSYNC_CRON_LIVE", default_value = "0 */15 * * * *")]
        live_cron: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fightsync=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = SyncConfig::from_env().context("Invalid sync configuration")?;
    let schemas = SchemaSet::load(&config.schemas_dir).with_context(|| {
        format!("Failed to load schemas from {}", config.schemas_dir.display())
    })?;
    let db = connect_db().await?;

    #[cfg(feature = "browser")]
    if cli.browser {
        let fetcher = fightsync_client::BrowserFetcher::new()
            .await
            .context("Failed to launch headless browser")?
            .wait_for(cli.wait_for);
        let ctx = SyncContext::new(fetcher, CssExtractor::new(), db.sync_store(), schemas, config);
        return run(cli.command, ctx).await;
    }

    let fetcher = ReqwestFetcher::new()
        .context("Failed to create HTTP client")?
        .restrict_to_host(&config.base_url);
    let ctx = SyncContext::new(fetcher, CssExtractor::new(), db.sync_store(), schemas, config);
    run(cli.command, ctx).await
}

/// Connect with `DATABASE_URL` / `DATABASE_PASSWORD` and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().context("Database configuration")?;
    tracing::debug!(?config, "Connecting to database");

    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    Ok(db)
}

async fn run<F: Fetcher + 'static>(command: Commands, ctx: Ctx<F>) -> Result<()> {
    let now = Utc::now();
    let config = ctx.config().clone();

    let report = match command {
        Commands::Sweep { start_page } => {
            EventSyncDriver::new(ctx)
                .run(SyncWindow::All { start_page }, now)
                .await
        }
        Commands::Sync {
            days,
            upcoming,
            skip_fighters,
        } => {
            let window = if upcoming {
                SyncWindow::Upcoming
            } else {
                SyncWindow::Around {
                    days: days.unwrap_or(config.days_lookback),
                }
            };
            window_sync(ctx, window, !skip_fighters, now).await
        }
        Commands::Live { hours } => {
            let hours = hours.unwrap_or(config.live_window_hours);
            EventSyncDriver::new(ctx)
                .run(SyncWindow::Live { hours }, now)
                .await
        }
        Commands::Fighters { all } => {
            let policy = if all {
                RefreshPolicy::AllFighters
            } else {
                RefreshPolicy::FlaggedOrRecent {
                    recent_days: config.recent_fight_days,
                }
            };
            FighterSyncDriver::new(ctx).run(policy, now).await
        }
        Commands::Event { url } => {
            let url = site_url(&config.base_url, &url)?;
            EventSyncDriver::new(ctx).sync_event(&url, now).await
        }
        Commands::Fighter { url } => {
            let url = site_url(&config.base_url, &url)?;
            FighterSyncDriver::new(ctx).sync_fighter_url(&url, now).await
        }
        Commands::Schedule {
            sync_cron,
            fighters_cron,
            live_cron,
        } => {
            let crons = schedule::Crons {
                sync: sync_cron,
                fighters: fighters_cron,
                live: live_cron,
            };
            return schedule::run(ctx, crons).await;
        }
    };

    log_report(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);
    let storage_failures = report.storage_failures();
    if storage_failures > 0 {
        anyhow::bail!("{storage_failures} database write(s) failed; see the report's failures");
    }
    Ok(())
}

/// Event sync over `window`, optionally followed by a fighter refresh for
/// everyone the events flagged.
pub(crate) async fn window_sync<F: Fetcher>(
    ctx: Ctx<F>,
    window: SyncWindow,
    with_fighters: bool,
    now: DateTime<Utc>,
) -> SyncReport {
    let recent_days = ctx.config().recent_fight_days;
    let mut report = EventSyncDriver::new(ctx.clone()).run(window, now).await;
    if with_fighters {
        let fighters = FighterSyncDriver::new(ctx)
            .run(RefreshPolicy::FlaggedOrRecent { recent_days }, Utc::now())
            .await;
        report.absorb(fighters);
        report = report.finish();
    }
    report
}

pub(crate) fn log_report(report: &SyncReport) {
    tracing::info!(
        run_id = %report.run_id,
        mode = %report.mode,
        writes = report.total_writes(),
        failures = report.failures.len(),
        storage_failures = report.storage_failures(),
        "Run complete"
    );
}

/// Resolve a user-supplied page URL against the site root.
fn site_url(base: &Url, raw: &str) -> Result<String> {
    let url = base
        .join(raw.trim())
        .with_context(|| format!("Invalid URL: {raw}"))?;
    Ok(url.to_string())
}
