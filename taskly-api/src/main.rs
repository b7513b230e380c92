//! # Taskly API Server
//!
//! Serves the Taskly REST API: registration and login, teams with
//! membership management, and tasks scoped to team members.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/taskly JWT_SECRET=... cargo run -p taskly-api
//! DATABASE_URL=memory:// JWT_SECRET=... cargo run -p taskly-api
//! ```

use std::sync::Arc;
use taskly_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskly_shared::{
    db::pool::{close_pool, DatabaseConfig},
    store::{MemoryStore, PgStore, SharedStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

const DEFAULT_LOG_FILTER: &str = "taskly_api=debug,taskly_shared=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Taskly API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let (store, pg) = open_store(&config).await?;

    let addr = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pg) = pg {
        close_pool(pg.pool()).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let fmt_layer = if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Opens the store selected by `DATABASE_URL`
///
/// The PostgreSQL handle is returned alongside so its pool can be closed on
/// shutdown.
async fn open_store(config: &Config) -> anyhow::Result<(SharedStore, Option<PgStore>)> {
    if config.database.is_memory() {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        return Ok((Arc::new(MemoryStore::new()), None));
    }

    let store = PgStore::connect(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DatabaseConfig::default()
    })
    .await?;
    tracing::info!("Database pool created");

    store.migrate().await?;
    tracing::info!("Database migrations applied");

    Ok((Arc::new(store.clone()), Some(store)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
