//! tuner-server - tuner backend server
//!
//! REST API for prompt optimization, conversations and parameter extraction.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tuner_core::oracle::HttpOracle;
use tuner_core::{MemoryHistoryStore, Settings, SharedHistoryStore, SharedOracle};

mod config;
mod error;
mod routes;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("tuner_server=info".parse()?)
                .add_directive("tuner_core=info".parse()?),
        )
        .init();

    info!("tuner-server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Data directory: {}", config.data_dir.display());

    let settings = Settings::load();
    let oracle = HttpOracle::from_settings(&settings).context("Failed to create completion client")?;
    info!(
        "Completion oracle: {} ({})",
        oracle.config().model,
        oracle.config().api_url
    );
    if oracle.config().api_key.is_none() {
        warn!("AI_API_KEY is not set; every completion will be empty");
    }
    let oracle: SharedOracle = Arc::new(oracle);

    let history = open_history(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, oracle, history);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

/// Open the history store selected by the configuration
fn open_history(config: &Config) -> anyhow::Result<SharedHistoryStore> {
    match &config.database_path {
        #[cfg(feature = "db")]
        Some(path) => {
            let store = tuner_core::store::SqliteHistoryStore::open(path)
                .with_context(|| format!("Failed to open history database {}", path.display()))?;
            info!("History database: {}", path.display());
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db"))]
        Some(path) => {
            warn!(
                "TUNER_DATABASE_PATH={} ignored: built without the `db` feature",
                path.display()
            );
            Ok(Arc::new(MemoryHistoryStore::new()))
        }
        None => Ok(Arc::new(MemoryHistoryStore::new())),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
