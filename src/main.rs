use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use portal_pnd::config::{self, AppConfig};
use portal_pnd::database::{DatabaseManager, DynStore, MemoryStore, PgStore};
use portal_pnd::storage::BackendStorage;
use portal_pnd::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, PND_* keys, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config: AppConfig = config::config().clone();
    tracing::info!("Starting Portal PND API in {:?} mode", config.environment);
    tracing::debug!("{:?}", config);

    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("PND_JWT_SECRET is not set; every authenticated request will be rejected");
    }

    let store: DynStore = match std::env::var("PND_MEMORY_STORE").as_deref() {
        Ok("1") | Ok("true") => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        _ => {
            let pool = DatabaseManager::connect(&config.backend)
                .await
                .context("failed to connect to the backend database")?;
            Arc::new(PgStore::new(pool))
        }
    };

    let mut state = AppState::new(store, config.clone());
    match BackendStorage::from_config(&config.backend) {
        Ok(storage) => state = state.with_storage(Arc::new(storage)),
        Err(e) => tracing::warn!("Image uploads disabled: {}", e),
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Portal PND API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
