use std::path::Path;
use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use url::Url;

use fightsync_client::{CssExtractor, ReqwestFetcher};
use fightsync_core::{RetryPolicy, SchemaSet, SyncConfig, SyncContext};
use fightsync_db::Database;
use fightsync_server::live::LiveSync;
use fightsync_server::routes;
use fightsync_server::state::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Router plus handles the tests use to seed and inspect the database.
pub struct TestApp {
    pub router: Router,
    pub db: Database,
    _container: ContainerAsync<GenericImage>,
}

/// App with admin routes enabled and a live runner pointed at a closed port.
pub async fn setup_test_app() -> TestApp {
    build(Some(TEST_ADMIN_TOKEN.to_string()), true).await
}

/// App with no admin token configured.
pub async fn setup_test_app_no_auth() -> TestApp {
    build(None, true).await
}

/// App whose live runner could not be configured.
pub async fn setup_test_app_without_live() -> TestApp {
    build(Some(TEST_ADMIN_TOKEN.to_string()), false).await
}

async fn build(admin_token: Option<String>, with_live: bool) -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "fightsync_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/fightsync_test");
    let db = Database::from_pool(retry_connect(&url).await);
    db.migrate().await.expect("Failed to run migrations");

    let live = with_live.then(|| live_sync(&db));
    let state = Arc::new(AppState {
        db: db.clone(),
        admin_token,
        live,
    });

    TestApp {
        router: routes::router(state),
        db,
        _container: container,
    }
}

fn live_sync(db: &Database) -> LiveSync {
    let schemas_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas");
    let schemas = SchemaSet::load(&schemas_dir).expect("Failed to load shipped schemas");
    // Nothing listens on port 9; every fetch fails fast.
    let mut config = SyncConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
    config.retry_attempts = 1;
    let fetcher = ReqwestFetcher::new().unwrap().restrict_to_host(&config.base_url);
    let ctx = SyncContext::new(fetcher, CssExtractor::new(), db.sync_store(), schemas, config)
        .with_retry(RetryPolicy::immediate(1));
    LiveSync::new(ctx)
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}
