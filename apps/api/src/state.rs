use std::sync::Arc;

use crate::config::Config;
use crate::providers::ProviderRegistry;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn JobStore>,
    pub providers: ProviderRegistry,
    pub config: Config,
}
