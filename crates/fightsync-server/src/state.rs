use fightsync_db::Database;

use crate::live::LiveSync;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    /// Bearer token for the admin routes (None = admin routes answer 403).
    pub admin_token: Option<String>,
    /// Background live-check runner (None = schemas or site config unavailable).
    pub live: Option<LiveSync>,
}
