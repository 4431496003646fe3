//! Ingestion pipeline: normalize, detect duplicates, store.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dedup::detector::{deduplicate_jobs, detect_duplicates, mixes_sources};
use crate::errors::AppError;
use crate::jobs::normalize::{clean_list, normalize, require_present, validate};
use crate::models::job::{JobDraft, JobRecord, JobStatus};
use crate::providers::{
    FetchQuery, ProviderKind, ProviderRegistry, ProviderWarning, DEFAULT_QUERY,
};
use crate::store::{JobFilter, JobStore, StoreError};

pub const DEFAULT_FETCH_LIMIT: usize = 50;
pub const MAX_FETCH_LIMIT: usize = 100;
const PREVIEW_SIZE: usize = 10;

/// Providers queried for `ALL`. The scraping service is left out because it is slow.
const ALL_SOURCES: [ProviderKind; 3] = [ProviderKind::Google, ProviderKind::Adzuna, ProviderKind::Jooble];

/// Runs one draft through the pipeline and persists it, flagged when it duplicates an
/// existing record.
pub async fn create_job(
    store: &dyn JobStore,
    draft: JobDraft,
    recruiter_id: Option<Uuid>,
) -> Result<JobRecord, AppError> {
    let draft = normalize(draft);
    validate(&draft)?;

    let mut record = JobRecord::from_draft(draft, recruiter_id);
    if let Some(found) = detect_duplicates(store, &mut record).await? {
        info!(
            "New job '{}' at {} duplicates {} (score {})",
            record.title, record.company, found.original_id, found.score
        );
    }
    store.create(&record).await?;
    Ok(record)
}

/// Partial update. Absent fields are left alone; a blank `sourceUrl` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience_required: Option<String>,
    pub salary_range: Option<String>,
    pub notes: Option<String>,
    pub status: Option<JobStatus>,
    pub recruiter_id: Option<Uuid>,
}

fn set_required(
    field: &mut String,
    value: Option<String>,
    name: &'static str,
) -> Result<bool, AppError> {
    let Some(value) = value else {
        return Ok(false);
    };
    let value = value.trim().to_string();
    require_present(name, &value)?;
    let changed = *field != value;
    *field = value;
    Ok(changed)
}

fn set_optional(field: &mut Option<String>, value: Option<String>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
    let changed = *field != value;
    *field = value;
    changed
}

/// Applies `patch` and re-runs duplicate detection when a matching field changed.
pub async fn update_job(
    store: &dyn JobStore,
    id: Uuid,
    patch: JobPatch,
) -> Result<JobRecord, AppError> {
    let mut record = store.get(id).await?.ok_or(StoreError::NotFound(id))?;

    let mut rematch = set_required(&mut record.title, patch.title, "title")?;
    rematch |= set_required(&mut record.company, patch.company, "company")?;
    rematch |= set_required(&mut record.location, patch.location, "location")?;
    rematch |= set_optional(&mut record.source_url, patch.source_url);
    set_required(&mut record.description, patch.description, "description")?;
    set_optional(&mut record.experience_required, patch.experience_required);
    set_optional(&mut record.salary_range, patch.salary_range);
    set_optional(&mut record.notes, patch.notes);
    if let Some(skills) = patch.skills {
        record.skills = clean_list(skills);
    }
    if let Some(status) = patch.status {
        record.status = status;
    }
    if let Some(recruiter_id) = patch.recruiter_id {
        record.recruiter_id = Some(recruiter_id);
    }

    if rematch {
        debug!("Matching fields of job {id} changed, re-running duplicate detection");
        detect_duplicates(store, &mut record).await?;
    }
    store.update(&record).await?;
    Ok(record)
}

// ────────────────────────────────────────────────────────────────────────────
// Bulk import
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub created: usize,
    pub duplicates: usize,
    /// Dropped by the exact-key pre-pass before reaching the store.
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
}

/// Imports drafts one at a time. A failing draft is logged and skipped; the ones before
/// it stay stored.
pub async fn bulk_import(
    store: &dyn JobStore,
    drafts: Vec<JobDraft>,
    recruiter_id: Option<Uuid>,
) -> BulkReport {
    let received = drafts.len();
    let drafts = if mixes_sources(&drafts) {
        deduplicate_jobs(drafts)
    } else {
        drafts
    };

    let mut report = BulkReport {
        skipped: received - drafts.len(),
        ..BulkReport::default()
    };

    for (index, draft) in drafts.into_iter().enumerate() {
        match create_job(store, draft, recruiter_id).await {
            Ok(record) => {
                report.created += 1;
                if record.is_duplicate {
                    report.duplicates += 1;
                }
            }
            Err(e) => {
                warn!("Bulk import: skipping record {index}: {e}");
                report.failed += 1;
                report.failures.push(BulkFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "Bulk import: {} created ({} duplicates), {} skipped, {} failed",
        report.created, report.duplicates, report.skipped, report.failed
    );
    report
}

// ────────────────────────────────────────────────────────────────────────────
// Fetch and store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchSource {
    Google,
    Adzuna,
    Jooble,
    IndeedRss,
    #[serde(rename = "JOBSPY")]
    JobSpy,
    #[default]
    All,
}

impl FetchSource {
    fn single(self) -> Option<ProviderKind> {
        match self {
            FetchSource::Google => Some(ProviderKind::Google),
            FetchSource::Adzuna => Some(ProviderKind::Adzuna),
            FetchSource::Jooble => Some(ProviderKind::Jooble),
            FetchSource::IndeedRss => Some(ProviderKind::IndeedRss),
            FetchSource::JobSpy => Some(ProviderKind::JobSpy),
            FetchSource::All => None,
        }
    }
}

/// Scraping-service sites, as a list or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SiteList {
    Many(Vec<String>),
    Joined(String),
}

impl SiteList {
    fn into_vec(self) -> Vec<String> {
        let sites = match self {
            SiteList::Many(sites) => sites,
            SiteList::Joined(joined) => joined.split(',').map(String::from).collect(),
        };
        clean_list(sites)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub query: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub source: FetchSource,
    pub limit: Option<usize>,
    pub sites: Option<SiteList>,
    pub country: Option<String>,
    pub recruiter_id: Option<Uuid>,
}

impl FetchRequest {
    fn to_query(&self) -> Result<FetchQuery, AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_FETCH_LIMIT);
        if !(1..=MAX_FETCH_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_FETCH_LIMIT}"
            )));
        }
        let text = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY);

        let mut query = FetchQuery::new(text, limit);
        query.location = self.location.clone();
        query.sites = self.sites.clone().map(SiteList::into_vec).unwrap_or_default();
        query.country = self.country.clone();
        Ok(query)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
    pub warnings: Vec<ProviderWarning>,
    /// First few fetched drafts, for preview.
    pub jobs: Vec<JobDraft>,
}

/// Stores fetched drafts, skipping any whose exact title, company, location and source
/// are already stored. Returns how many were created.
async fn store_fetched(
    store: &dyn JobStore,
    drafts: &[JobDraft],
    recruiter_id: Option<Uuid>,
) -> usize {
    let mut stored = 0;
    for draft in drafts {
        let draft = normalize(draft.clone());
        let filter = JobFilter {
            source: Some(draft.source),
            ..JobFilter::default()
        };
        let exists = match store.find_existing(&filter).await {
            Ok(existing) => existing.iter().any(|job| {
                job.title == draft.title
                    && job.company == draft.company
                    && job.location == draft.location
            }),
            Err(e) => {
                warn!("Could not check for an existing copy of '{}': {e}", draft.title);
                continue;
            }
        };
        if exists {
            debug!("Skipping already stored job '{}' at {}", draft.title, draft.company);
            continue;
        }

        match create_job(store, draft, recruiter_id).await {
            Ok(_) => stored += 1,
            Err(e) => warn!("Failed to store fetched job: {e}"),
        }
    }
    stored
}

/// Fetches from one provider (errors propagate) or from all of them (failures become
/// warnings), then stores what came back.
pub async fn fetch_and_store(
    store: &dyn JobStore,
    providers: &ProviderRegistry,
    request: FetchRequest,
) -> Result<FetchReport, AppError> {
    let query = request.to_query()?;

    let (drafts, warnings) = match request.source.single() {
        Some(kind) => {
            let provider = providers
                .get(kind)
                .ok_or_else(|| AppError::Validation(format!("provider {kind} is not available")))?;
            let drafts = provider.fetch(&query).await?;
            // A scraper or search provider may tag rows with several boards.
            let drafts = if mixes_sources(&drafts) {
                deduplicate_jobs(drafts)
            } else {
                drafts
            };
            (drafts, Vec::new())
        }
        None => {
            let per_provider = (query.limit / ALL_SOURCES.len()).max(1);
            let outcome = providers
                .fetch_many(&ALL_SOURCES, &query.with_limit(per_provider))
                .await;
            (deduplicate_jobs(outcome.drafts), outcome.warnings)
        }
    };

    let fetched = drafts.len();
    let stored = store_fetched(store, &drafts, request.recruiter_id).await;
    info!(
        "Fetch from {:?}: {fetched} fetched, {stored} stored, {} warnings",
        request.source,
        warnings.len()
    );

    Ok(FetchReport {
        fetched,
        stored,
        skipped: fetched - stored,
        warnings,
        jobs: drafts.into_iter().take(PREVIEW_SIZE).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::models::job::JobSource;
    use crate::providers::{JobProvider, ProviderError};
    use crate::store::InMemoryJobStore;

    fn draft(title: &str, company: &str, location: &str, url: Option<&str>) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            description: "Build and run services".to_string(),
            source: JobSource::Linkedin,
            source_url: url.map(String::from),
            ..JobDraft::default()
        }
    }

    #[tokio::test]
    async fn test_identical_posting_is_flagged_as_duplicate() {
        let store = InMemoryJobStore::new();
        let a = create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();
        let b = create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();

        assert!(!a.is_duplicate);
        assert!(b.is_duplicate);
        assert_eq!(b.duplicate_of, Some(a.id));
        assert_eq!(b.similarity_score, Some(100));
    }

    #[tokio::test]
    async fn test_title_only_match_is_not_a_duplicate() {
        let store = InMemoryJobStore::new();
        let a = create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();
        let c = create_job(&store, draft("Senior Engineer", "Beta Corp", "SF", None), None)
            .await
            .unwrap();

        assert_eq!(crate::dedup::similarity::similarity(&a, &c), 40);
        assert!(!c.is_duplicate);
        assert_eq!(c.duplicate_of, None);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_required_fields() {
        let store = InMemoryJobStore::new();
        let err = create_job(&store, draft("  ", "Acme", "NYC", None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.find_existing(&JobFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rematches_and_clears() {
        let store = InMemoryJobStore::new();
        let a = create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();
        let b = create_job(&store, draft("Designer", "Other", "LA", None), None)
            .await
            .unwrap();
        assert!(!b.is_duplicate);

        let patch = JobPatch {
            title: Some("Senior Engineer".to_string()),
            company: Some("Acme".to_string()),
            location: Some("NYC".to_string()),
            source_url: Some("u1".to_string()),
            ..JobPatch::default()
        };
        let b = update_job(&store, b.id, patch).await.unwrap();
        assert!(b.is_duplicate);
        assert_eq!(b.duplicate_of, Some(a.id));

        let patch = JobPatch {
            company: Some("Someone Else".to_string()),
            location: Some("Berlin".to_string()),
            ..JobPatch::default()
        };
        let b = update_job(&store, b.id, patch).await.unwrap();
        assert!(!b.is_duplicate);
        assert_eq!(b.similarity_score, None);
    }

    #[tokio::test]
    async fn test_update_without_matching_changes_keeps_flags() {
        let store = InMemoryJobStore::new();
        create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();
        let b = create_job(&store, draft("Senior Engineer", "Acme", "NYC", Some("u1")), None)
            .await
            .unwrap();

        let patch = JobPatch {
            status: Some(JobStatus::Paused),
            salary_range: Some("  100k ".to_string()),
            ..JobPatch::default()
        };
        let updated = update_job(&store, b.id, patch).await.unwrap();
        assert!(updated.is_duplicate);
        assert_eq!(updated.status, JobStatus::Paused);
        assert_eq!(updated.salary_range.as_deref(), Some("100k"));
    }

    #[tokio::test]
    async fn test_update_missing_job() {
        let store = InMemoryJobStore::new();
        let err = update_job(&store, Uuid::new_v4(), JobPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_import_is_best_effort() {
        let store = InMemoryJobStore::new();
        let drafts = vec![
            draft("Senior Engineer", "Acme", "NYC", Some("u1")),
            draft("", "Broken", "Nowhere", None),
            draft("Senior Engineer", "Acme", "NYC", Some("u1")),
            draft("Analyst", "Beta", "SF", None),
        ];
        let report = bulk_import(&store, drafts, None).await;

        assert_eq!(report.created, 3);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.find_existing(&JobFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_import_prepass_for_mixed_sources() {
        let store = InMemoryJobStore::new();
        let mut other = draft("senior engineer", "ACME", "nyc", None);
        other.source = JobSource::Indeed;
        let drafts = vec![draft("Senior Engineer", "Acme", "NYC", Some("u1")), other];

        let report = bulk_import(&store, drafts, None).await;
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
    }

    struct Canned {
        kind: ProviderKind,
        drafts: Vec<JobDraft>,
    }

    #[async_trait]
    impl JobProvider for Canned {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
            Ok(self.drafts.iter().take(query.limit).cloned().collect())
        }
    }

    struct Failing(ProviderKind);

    #[async_trait]
    impl JobProvider for Failing {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn fetch(&self, _query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
            Err(ProviderError::missing_credentials(self.0, "KEY"))
        }
    }

    #[tokio::test]
    async fn test_fetch_all_isolates_failures_and_skips_stored() {
        let store = InMemoryJobStore::new();
        let registry = ProviderRegistry::default()
            .with(Arc::new(Canned {
                kind: ProviderKind::Google,
                drafts: vec![
                    draft("Rust Engineer", "Ferrous", "Remote", Some("g1")),
                    draft("Go Engineer", "Gopher", "Remote", Some("g2")),
                ],
            }))
            .with(Arc::new(Failing(ProviderKind::Adzuna)))
            .with(Arc::new(Canned {
                kind: ProviderKind::Jooble,
                drafts: vec![draft("Rust Engineer", "Ferrous", "Remote", Some("j1"))],
            }));

        let request = FetchRequest {
            limit: Some(9),
            ..FetchRequest::default()
        };
        let report = fetch_and_store(&store, &registry, request.clone()).await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.stored, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].provider, ProviderKind::Adzuna);

        let again = fetch_and_store(&store, &registry, request).await.unwrap();
        assert_eq!(again.stored, 0);
        assert_eq!(again.skipped, 2);
    }

    #[tokio::test]
    async fn test_fetch_single_source_propagates_errors() {
        let store = InMemoryJobStore::new();
        let registry = ProviderRegistry::default().with(Arc::new(Failing(ProviderKind::Jooble)));
        let request = FetchRequest {
            source: FetchSource::Jooble,
            ..FetchRequest::default()
        };
        let err = fetch_and_store(&store, &registry, request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Provider(ProviderError::MissingCredentials { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_single_source_collapses_cross_board_copies() {
        let store = InMemoryJobStore::new();
        let mut from_indeed = draft("Data Engineer", "Acme", "Delhi", Some("https://in.indeed.com/1"));
        from_indeed.source = JobSource::Indeed;
        let from_linkedin = draft("Data Engineer", "Acme", "Delhi", Some("https://linkedin.com/jobs/2"));
        let registry = ProviderRegistry::default().with(Arc::new(Canned {
            kind: ProviderKind::JobSpy,
            drafts: vec![from_indeed, from_linkedin],
        }));

        let request = FetchRequest {
            source: FetchSource::JobSpy,
            limit: Some(10),
            ..FetchRequest::default()
        };
        let report = fetch_and_store(&store, &registry, request).await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.stored, 1);
        let rows = store.find_existing(&JobFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, JobSource::Indeed);
    }

    #[tokio::test]
    async fn test_fetch_limit_is_validated() {
        let store = InMemoryJobStore::new();
        let request = FetchRequest {
            limit: Some(0),
            ..FetchRequest::default()
        };
        let err = fetch_and_store(&store, &ProviderRegistry::default(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_fetch_request_accepts_joined_sites() {
        let request: FetchRequest = serde_json::from_str(
            r#"{"source": "JOBSPY", "sites": "indeed, linkedin,,naukri", "limit": 5}"#,
        )
        .unwrap();
        assert_eq!(request.source, FetchSource::JobSpy);
        assert_eq!(
            request.to_query().unwrap().sites,
            vec!["indeed", "linkedin", "naukri"]
        );
    }
}
