//! Kudos server - employee awards nomination and review workflow

mod error;
mod extract;
mod identity;
mod models;
mod response;
mod routes;
mod store;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::store::Store;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
}

#[derive(Parser)]
#[command(name = "kudos", about = "Employee awards workflow server")]
struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind_addr: String,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:kudos.db")]
    database_url: String,

    /// Seconds between cycle auto-open/auto-close sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    sweep_interval_secs: u64,

    /// Email of the initial HR account, created at startup if absent
    #[arg(long, env = "ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Display name for the initial HR account
    #[arg(long, env = "ADMIN_NAME", default_value = "Administrator")]
    admin_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kudos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // Database connection
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Store::new(pool);

    if let Some(email) = &config.admin_email {
        store.ensure_admin(email, &config.admin_name).await?;
    }

    // Date-window transitions happen on a timer, not on request paths.
    let sweep_store = store.clone();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let today = chrono::Utc::now().date_naive();
            if let Err(err) = sweep_store.run_cycle_sweep(today).await {
                tracing::error!(error = %err, "Cycle sweep failed");
            }
        }
    });

    let state = Arc::new(AppState { store });

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
