//! Food reservation server - application entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the store: PostgreSQL (running migrations) when `DATABASE_URL`
//!    is set, otherwise in-memory
//! 3. Start the reservation expiry sweep
//! 4. Build the HTTP router and serve on the configured port

use std::sync::Arc;

use food_reservation_server::{
    AppState,
    clock::{Clock, SystemClock},
    config::Config,
    create_app, db,
    services::expiry,
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url, config.database_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    expiry::spawn_expiry_sweeper(store.clone(), clock.clone(), config.expiry_sweep_interval());
    tracing::info!(
        every_secs = config.expiry_sweep_interval_secs,
        "Reservation expiry sweep started"
    );

    let app = create_app(AppState::new(store, clock));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
