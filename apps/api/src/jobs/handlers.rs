use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::dedup::resolver::{self, ResolveAction, ResolveOutcome};
use crate::errors::AppError;
use crate::extraction::{self, HostMessage, PageReport};
use crate::jobs::export::{export_rows, to_csv};
use crate::jobs::ingest::{
    bulk_import, create_job, fetch_and_store, update_job, BulkReport, FetchReport, FetchRequest,
    JobPatch,
};
use crate::models::job::{DuplicateGroup, JobDraft, JobRecord, JobSource, JobStatus};
use crate::state::AppState;
use crate::store::JobFilter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterQuery {
    pub recruiter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub jobs: Vec<JobDraft>,
    pub recruiter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub duplicate_id: Uuid,
    pub original_id: Uuid,
    pub action: ResolveAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub source: Option<JobSource>,
    pub status: Option<JobStatus>,
    pub recruiter_id: Option<Uuid>,
    pub search: Option<String>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Query(params): Query<RecruiterQuery>,
    Json(draft): Json<JobDraft>,
) -> Result<(StatusCode, Json<JobRecord>), AppError> {
    let record = create_job(state.store.as_ref(), draft, params.recruiter_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<JobRecord>, AppError> {
    let record = update_job(state.store.as_ref(), id, patch).await?;
    Ok(Json(record))
}

/// POST /api/v1/jobs/bulk
pub async fn handle_bulk_import(
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> Result<Json<BulkReport>, AppError> {
    if req.jobs.is_empty() {
        return Err(AppError::Validation("jobs must not be empty".to_string()));
    }
    Ok(Json(
        bulk_import(state.store.as_ref(), req.jobs, req.recruiter_id).await,
    ))
}

/// POST /api/v1/jobs/fetch
pub async fn handle_fetch_jobs(
    State(state): State<AppState>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchReport>, AppError> {
    let report = fetch_and_store(state.store.as_ref(), &state.providers, req).await?;
    Ok(Json(report))
}

/// POST /api/v1/jobs/extract
pub async fn handle_extract(Json(req): Json<ExtractRequest>) -> Result<Json<PageReport>, AppError> {
    if req.url.trim().is_empty() {
        return Err(AppError::Validation("url must not be empty".to_string()));
    }
    Ok(Json(extraction::extract_page(req.url.trim(), &req.html)))
}

/// POST /api/v1/jobs/capture
pub async fn handle_capture(
    State(state): State<AppState>,
    Query(params): Query<RecruiterQuery>,
    Json(message): Json<HostMessage>,
) -> Result<Json<BulkReport>, AppError> {
    if message.platform != extraction::GENERIC_PLATFORM {
        return Err(AppError::UnprocessableEntity(format!(
            "unsupported capture platform '{}'",
            message.platform
        )));
    }
    Ok(Json(
        bulk_import(state.store.as_ref(), message.jobs, params.recruiter_id).await,
    ))
}

/// GET /api/v1/jobs/duplicates
pub async fn handle_duplicate_groups(
    State(state): State<AppState>,
    Query(params): Query<RecruiterQuery>,
) -> Result<Json<Vec<DuplicateGroup>>, AppError> {
    let groups = resolver::get_duplicate_groups(state.store.as_ref(), params.recruiter_id).await?;
    Ok(Json(groups))
}

/// POST /api/v1/jobs/duplicates/resolve
pub async fn handle_resolve_duplicate(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveOutcome>, AppError> {
    let outcome = resolver::resolve(
        state.store.as_ref(),
        req.duplicate_id,
        req.original_id,
        req.action,
    )
    .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/jobs/export
pub async fn handle_export(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = JobFilter {
        source: params.source,
        status: params.status,
        recruiter_id: params.recruiter_id,
        search: params.search.filter(|s| !s.trim().is_empty()),
        ..JobFilter::default()
    };
    let rows = export_rows(state.store.as_ref(), &filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"jobs.csv\""),
        ],
        to_csv(&rows),
    ))
}
