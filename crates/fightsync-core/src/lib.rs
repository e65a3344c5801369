pub mod config;
pub mod context;
pub mod dates;
pub mod error;
pub mod event_sync;
pub mod fighter_sync;
pub mod hash;
pub mod listing;
pub mod mapping;
pub mod models;
pub mod normalize;
pub mod policy;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod schema;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::SyncConfig;
pub use context::SyncContext;
pub use error::AppError;
pub use event_sync::EventSyncDriver;
pub use fighter_sync::FighterSyncDriver;
pub use hash::compute_hash;
pub use listing::SyncWindow;
pub use policy::RefreshPolicy;
pub use reconcile::SyncAction;
pub use report::SyncReport;
pub use retry::RetryPolicy;
pub use schema::{ExtractionSchema, SchemaResolver, SchemaSet};
pub use traits::{Extractor, Fetcher, SyncStore};
