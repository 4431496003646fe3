//! Store gateway: the narrow persistence seam the ingestion and dedup pipeline consumes.
//!
//! `AppState` carries an `Arc<dyn JobStore>`: `PgJobStore` when `DATABASE_URL` is set,
//! `InMemoryJobStore` otherwise (and in tests).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{JobRecord, JobRelation, JobSource, JobStatus};

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    InvalidRow(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Filter for `find_existing`. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub is_duplicate: Option<bool>,
    pub exclude_id: Option<Uuid>,
    pub duplicate_of: Option<Uuid>,
    pub recruiter_id: Option<Uuid>,
    pub source: Option<JobSource>,
    pub status: Option<JobStatus>,
    /// Case-insensitive substring over title, company and location.
    pub search: Option<String>,
}

impl JobFilter {
    /// Comparison set for duplicate detection: every non-duplicate, optionally minus one id.
    pub fn non_duplicates(exclude_id: Option<Uuid>) -> Self {
        Self {
            is_duplicate: Some(false),
            exclude_id,
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        if let Some(flag) = self.is_duplicate {
            if record.is_duplicate != flag {
                return false;
            }
        }
        if self.exclude_id == Some(record.id) {
            return false;
        }
        if let Some(target) = self.duplicate_of {
            if record.duplicate_of != Some(target) {
                return false;
            }
        }
        if let Some(recruiter) = self.recruiter_id {
            if record.recruiter_id != Some(recruiter) {
                return false;
            }
        }
        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::to_lowercase) {
            let hit = [&record.title, &record.company, &record.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&search));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Persistence operations used by the pipeline. All reads are ordered by
/// `created_at` ascending, then `id`, and are read-after-write consistent.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    async fn update(&self, record: &JobRecord) -> Result<(), StoreError>;

    async fn find_existing(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError>;

    /// Re-points every relation (and every `duplicate_of` pointer) from `from_id` to `to_id`.
    /// Returns the number of rows moved.
    async fn update_relations_bulk(&self, from_id: Uuid, to_id: Uuid) -> Result<u64, StoreError>;

    /// Deletes a job together with the relations that belong exclusively to it.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// `update_relations_bulk(duplicate_id, original_id)` followed by `delete(duplicate_id)`
    /// in a single transaction. Nothing is committed if either step fails.
    async fn merge(&self, duplicate_id: Uuid, original_id: Uuid) -> Result<u64, StoreError>;

    async fn add_relation(&self, relation: &JobRelation) -> Result<(), StoreError>;

    async fn relations_for(&self, job_id: Uuid) -> Result<Vec<JobRelation>, StoreError>;
}
