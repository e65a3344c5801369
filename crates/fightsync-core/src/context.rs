use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::hash::hash_of;
use crate::models::{FighterProfile, FighterRef, Record};
use crate::report::SyncReport;
use crate::retry::RetryPolicy;
use crate::schema::{ExtractionSchema, SchemaSet};
use crate::traits::{Extractor, Fetcher, SyncStore};

/// Everything a sync driver needs: the three collaborators plus settings.
///
/// Generic over its dependencies so tests can swap in the in-memory doubles.
#[derive(Clone)]
pub struct SyncContext<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    pub(crate) fetcher: F,
    pub(crate) extractor: E,
    pub(crate) store: S,
    pub(crate) schemas: Arc<SchemaSet>,
    pub(crate) config: Arc<SyncConfig>,
    pub(crate) retry: RetryPolicy,
}

impl<F, E, S> SyncContext<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: SyncStore,
{
    pub fn new(fetcher: F, extractor: E, store: S, schemas: SchemaSet, config: SyncConfig) -> Self {
        let retry = RetryPolicy::with_attempts(config.retry_attempts);
        Self {
            fetcher,
            extractor,
            store,
            schemas: Arc::new(schemas),
            config: Arc::new(config),
            retry,
        }
    }

    /// Override the retry policy (tests use [`RetryPolicy::immediate`]).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a page (with retries for transient failures) and apply a schema.
    pub(crate) async fn load(
        &self,
        url: &str,
        schema: &ExtractionSchema,
    ) -> Result<Vec<Record>, AppError> {
        let html = self.retry.run("fetch", || self.fetcher.fetch(url)).await?;
        tracing::debug!(url = %url, bytes = html.len(), schema = %schema.name, "Fetched page");
        self.extractor.extract(&html, schema)
    }

    /// Resolve a referenced fighter to a row id, inserting a stub on first sight.
    ///
    /// The stub insert is keyed on `source_url`, so concurrent discovery of the
    /// same opponent yields one row.
    pub(crate) async fn ensure_fighter(
        &self,
        fighter: &FighterRef,
        report: &mut SyncReport,
    ) -> Result<i64, AppError> {
        let existing = self
            .retry
            .run("find_fighter", || self.store.find_fighter(&fighter.source_url))
            .await?;
        if let Some(row) = existing {
            return Ok(row.id);
        }

        let stub_hash = hash_of(&FighterProfile::stub(fighter))?;
        let ensured = self
            .retry
            .run("ensure_fighter_stub", || {
                self.store.ensure_fighter_stub(fighter, &stub_hash)
            })
            .await?;
        if ensured.created {
            report.fighter_stubs_created += 1;
            tracing::info!(url = %fighter.source_url, name = %fighter.name, "Created fighter stub");
        }
        Ok(ensured.id)
    }
}
