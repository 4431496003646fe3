mod config;
mod db;
mod dedup;
mod errors;
mod extraction;
mod jobs;
mod models;
mod providers;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::providers::ProviderRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{InMemoryJobStore, JobStore, PgJobStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job-intake v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => Arc::new(PgJobStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; jobs are kept in memory and lost on restart");
            Arc::new(InMemoryJobStore::new())
        }
    };

    let providers = ProviderRegistry::from_config(&config)?;
    info!("Provider registry initialized");

    let state = AppState {
        store,
        providers,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
