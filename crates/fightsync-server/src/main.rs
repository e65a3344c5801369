use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fightsync_client::{CssExtractor, ReqwestFetcher};
use fightsync_core::{SchemaSet, SyncConfig, SyncContext};
use fightsync_db::{Database, DatabaseConfig};
use fightsync_server::live::LiveSync;
use fightsync_server::routes;
use fightsync_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fightsync=info".parse()?))
        .with_target(false)
        .init();

    let admin_token = std::env::var("FIGHTSYNC_ADMIN_TOKEN")
        .ok()
        .filter(|t| !t.is_empty());
    if admin_token.is_none() {
        tracing::warn!("FIGHTSYNC_ADMIN_TOKEN is not set; admin routes will answer 403");
    }
    let port = std::env::var("FIGHTSYNC_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;

    let live = match live_sync(&db) {
        Ok(live) => Some(live),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Live checks disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        db,
        admin_token,
        live,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wire the scraper the live endpoint drives, from the same environment
/// the CLI reads.
fn live_sync(db: &Database) -> anyhow::Result<LiveSync> {
    let config = SyncConfig::from_env().context("Invalid sync configuration")?;
    let schemas = SchemaSet::load(&config.schemas_dir).with_context(|| {
        format!("Failed to load schemas from {}", config.schemas_dir.display())
    })?;
    let fetcher = ReqwestFetcher::new()?.restrict_to_host(&config.base_url);
    let ctx = SyncContext::new(fetcher, CssExtractor::new(), db.sync_store(), schemas, config);
    Ok(LiveSync::new(ctx))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
