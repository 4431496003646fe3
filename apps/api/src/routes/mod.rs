pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion
        .route("/api/v1/jobs", post(handlers::handle_create_job))
        .route("/api/v1/jobs/:id", patch(handlers::handle_update_job))
        .route("/api/v1/jobs/bulk", post(handlers::handle_bulk_import))
        .route("/api/v1/jobs/fetch", post(handlers::handle_fetch_jobs))
        // Browser-side extraction
        .route("/api/v1/jobs/extract", post(handlers::handle_extract))
        .route("/api/v1/jobs/capture", post(handlers::handle_capture))
        // Duplicates
        .route(
            "/api/v1/jobs/duplicates",
            get(handlers::handle_duplicate_groups),
        )
        .route(
            "/api/v1/jobs/duplicates/resolve",
            post(handlers::handle_resolve_duplicate),
        )
        // Reporting
        .route("/api/v1/jobs/export", get(handlers::handle_export))
        .with_state(state)
}
