//! Duplicate resolver: operator-facing grouping and merge/delete of stored duplicates.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::job::{DuplicateGroup, JobRecord};
use crate::store::{JobFilter, JobStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    Merge,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub action: ResolveAction,
    pub removed_id: Uuid,
    pub original_id: Uuid,
    /// References re-pointed at the original (always 0 for `delete`).
    pub moved_references: u64,
}

/// Groups every duplicate in scope under the original it ultimately points at.
///
/// Chains (`c → b → a`) are flattened to their root so each group is one level deep.
/// Groups whose original no longer exists are dropped with a warning.
pub async fn get_duplicate_groups(
    store: &dyn JobStore,
    recruiter_id: Option<Uuid>,
) -> Result<Vec<DuplicateGroup>, StoreError> {
    let duplicates = store
        .find_existing(&JobFilter {
            is_duplicate: Some(true),
            recruiter_id,
            ..JobFilter::default()
        })
        .await?;

    let pointers: HashMap<Uuid, Uuid> = duplicates
        .iter()
        .filter_map(|d| d.duplicate_of.map(|target| (d.id, target)))
        .collect();

    // Group key order follows the first duplicate seen for each root.
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, Vec<JobRecord>> = HashMap::new();
    for duplicate in duplicates {
        let Some(target) = duplicate.duplicate_of else {
            continue;
        };
        let root = resolve_root(target, &pointers);
        if !grouped.contains_key(&root) {
            order.push(root);
        }
        grouped.entry(root).or_default().push(duplicate);
    }

    let mut groups = Vec::with_capacity(order.len());
    for root in order {
        let Some(original) = store.get(root).await? else {
            warn!("Duplicate group points at missing original {root}; skipping");
            continue;
        };
        let duplicates = grouped.remove(&root).unwrap_or_default();
        groups.push(DuplicateGroup {
            original,
            duplicates,
        });
    }
    Ok(groups)
}

/// Follows `duplicate_of` pointers until reaching an id that is not itself a duplicate.
fn resolve_root(start: Uuid, pointers: &HashMap<Uuid, Uuid>) -> Uuid {
    let mut current = start;
    let mut visited = HashSet::from([start]);
    while let Some(&next) = pointers.get(&current) {
        if !visited.insert(next) {
            break;
        }
        current = next;
    }
    current
}

/// Merges or deletes `duplicate_id`.
///
/// Both ids must exist before anything is written. `merge` re-points every relation of
/// the duplicate at the original and then deletes it, atomically; `delete` removes the
/// duplicate and its own relations and leaves the original untouched.
pub async fn resolve(
    store: &dyn JobStore,
    duplicate_id: Uuid,
    original_id: Uuid,
    action: ResolveAction,
) -> Result<ResolveOutcome, ResolveError> {
    if duplicate_id == original_id {
        return Err(ResolveError::SameRecord(duplicate_id));
    }
    let duplicate = store
        .get(duplicate_id)
        .await?
        .ok_or(StoreError::NotFound(duplicate_id))?;
    store
        .get(original_id)
        .await?
        .ok_or(StoreError::NotFound(original_id))?;

    if duplicate.duplicate_of != Some(original_id) {
        warn!(
            "Resolving {duplicate_id} against {original_id}, but it is recorded as a duplicate of {:?}",
            duplicate.duplicate_of
        );
    }

    let moved_references = match action {
        ResolveAction::Merge => store.merge(duplicate_id, original_id).await?,
        ResolveAction::Delete => {
            store.delete(duplicate_id).await?;
            0
        }
    };

    info!("Resolved duplicate {duplicate_id} via {action:?} (original {original_id})");

    Ok(ResolveOutcome {
        action,
        removed_id: duplicate_id,
        original_id,
        moved_references,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("a record cannot be resolved against itself ({0})")]
    SameRecord(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
