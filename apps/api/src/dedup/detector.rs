//! Duplicate Detector and the exact-key batch pre-pass.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::dedup::similarity::{similarity, MatchFields};
use crate::models::job::{JobDraft, JobRecord};
use crate::store::{JobFilter, JobStore, StoreError};

/// Scores at or above this mark a duplicate.
pub const DUPLICATE_THRESHOLD: u8 = 90;

pub fn is_duplicate_score(score: u8) -> bool {
    score >= DUPLICATE_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub original_id: Uuid,
    pub score: u8,
}

/// Returns the first candidate, in iteration order, scoring at or above the threshold.
///
/// This is the *first* qualifying match, not the highest-scoring one. Callers get a
/// stable answer by passing candidates in creation order (what `JobStore` returns).
pub fn find_duplicate<'a, I>(subject: MatchFields<'_>, candidates: I) -> Option<DuplicateMatch>
where
    I: IntoIterator<Item = &'a JobRecord>,
{
    candidates.into_iter().find_map(|candidate| {
        let score = similarity(subject, candidate);
        is_duplicate_score(score).then_some(DuplicateMatch {
            original_id: candidate.id,
            score,
        })
    })
}

/// Compares `record` against every stored non-duplicate (excluding its own id) and sets
/// or clears its duplicate fields accordingly.
pub async fn detect_duplicates(
    store: &dyn JobStore,
    record: &mut JobRecord,
) -> Result<Option<DuplicateMatch>, StoreError> {
    let existing = store
        .find_existing(&JobFilter::non_duplicates(Some(record.id)))
        .await?;

    let found = find_duplicate(MatchFields::from(&*record), &existing);
    match found {
        Some(m) => {
            debug!(
                "Job {} duplicates {} (score {})",
                record.id, m.original_id, m.score
            );
            record.mark_duplicate(m.original_id, m.score);
        }
        None => record.clear_duplicate(),
    }
    Ok(found)
}

fn exact_key(draft: &JobDraft) -> String {
    format!(
        "{}|{}|{}",
        draft.title.trim().to_lowercase(),
        draft.company.trim().to_lowercase(),
        draft.location.trim().to_lowercase()
    )
}

/// Keeps the first draft per case-insensitive `(title, company, location)` key.
/// Idempotent and order-preserving.
pub fn deduplicate_jobs(drafts: Vec<JobDraft>) -> Vec<JobDraft> {
    let mut seen = HashSet::new();
    drafts
        .into_iter()
        .filter(|draft| seen.insert(exact_key(draft)))
        .collect()
}

/// True when a batch carries drafts from more than one source.
pub fn mixes_sources(drafts: &[JobDraft]) -> bool {
    drafts
        .split_first()
        .map(|(first, rest)| rest.iter().any(|d| d.source != first.source))
        .unwrap_or(false)
}
