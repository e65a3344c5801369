use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://www.tapology.com";
pub const DEFAULT_PROMOTION_PATH: &str =
    "/fightcenter/promotions/1-ultimate-fighting-championship-ufc";

/// Longest day window a sync or refresh pass accepts.
pub const MAX_DAYS: i64 = 3650;
/// Longest live-check window, in hours.
pub const MAX_LIVE_HOURS: i64 = 48;

/// Settings shared by every sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: Url,
    pub promotion_path: String,
    pub schemas_dir: PathBuf,
    pub days_lookback: i64,
    pub concurrency: usize,
    pub retry_attempts: u32,
    pub live_window_hours: i64,
    pub recent_fight_days: i64,
    pub max_listing_pages: u32,
}

impl SyncConfig {
    /// Default settings against the given site.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            promotion_path: DEFAULT_PROMOTION_PATH.to_string(),
            schemas_dir: PathBuf::from("schemas"),
            days_lookback: 7,
            concurrency: 5,
            retry_attempts: 3,
            live_window_hours: 4,
            recent_fight_days: 30,
            max_listing_pages: 200,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `FIGHTSYNC_BASE_URL` (default `https://www.tapology.com`)
    /// - `FIGHTSYNC_PROMOTION_PATH` (default the UFC promotion page)
    /// - `FIGHTSYNC_SCHEMAS_DIR` (default `schemas`)
    /// - `DAYS_LOOKBACK` (7), `CONCURRENT_REQUESTS` (5), `RETRY_ATTEMPTS` (3)
    /// - `LIVE_WINDOW_HOURS` (4), `RECENT_FIGHT_DAYS` (30), `MAX_LISTING_PAGES` (200)
    ///
    /// Numeric values must be at least 1; day windows are capped at
    /// [`MAX_DAYS`] and the live window at [`MAX_LIVE_HOURS`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw = lookup("FIGHTSYNC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw).map_err(|e| {
            AppError::ConfigError(format!("Invalid FIGHTSYNC_BASE_URL '{raw}': {e}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "FIGHTSYNC_BASE_URL must be http(s), got '{raw}'"
            )));
        }
        let defaults = Self::new(base_url);

        let config = Self {
            promotion_path: lookup("FIGHTSYNC_PROMOTION_PATH").unwrap_or(defaults.promotion_path),
            schemas_dir: lookup("FIGHTSYNC_SCHEMAS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.schemas_dir),
            days_lookback: bounded(&lookup, "DAYS_LOOKBACK", defaults.days_lookback, MAX_DAYS)?,
            concurrency: bounded(&lookup, "CONCURRENT_REQUESTS", defaults.concurrency, 64)?,
            retry_attempts: bounded(&lookup, "RETRY_ATTEMPTS", defaults.retry_attempts, 20)?,
            live_window_hours: bounded(
                &lookup,
                "LIVE_WINDOW_HOURS",
                defaults.live_window_hours,
                MAX_LIVE_HOURS,
            )?,
            recent_fight_days: bounded(
                &lookup,
                "RECENT_FIGHT_DAYS",
                defaults.recent_fight_days,
                MAX_DAYS,
            )?,
            max_listing_pages: bounded(
                &lookup,
                "MAX_LISTING_PAGES",
                defaults.max_listing_pages,
                10_000,
            )?,
            base_url: defaults.base_url,
        };
        Ok(config)
    }

    /// Absolute URL of the promotion's event listing.
    pub fn promotion_url(&self) -> Result<Url, AppError> {
        self.base_url.join(&self.promotion_path).map_err(|e| {
            AppError::ConfigError(format!(
                "Invalid promotion path '{}': {e}",
                self.promotion_path
            ))
        })
    }
}

/// Parse `key` as an integer in `1..=max`, or fall back to `default` when unset.
fn bounded<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    max: T,
) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + Default + Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let parsed: T = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed <= T::default() {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    if parsed > max {
        return Err(AppError::ConfigError(format!("{key} must be at most {max}")));
    }
    Ok(parsed)
}
