use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobFilter, JobStore, StoreError};
use crate::models::job::{JobRecord, JobRelation};

#[derive(Debug, Clone, Default)]
struct State {
    jobs: Vec<JobRecord>,
    relations: Vec<JobRelation>,
}

impl State {
    fn move_relations(&mut self, from_id: Uuid, to_id: Uuid) -> u64 {
        let mut moved = 0;
        for relation in self.relations.iter_mut().filter(|r| r.job_id == from_id) {
            relation.job_id = to_id;
            moved += 1;
        }
        for job in self
            .jobs
            .iter_mut()
            .filter(|j| j.duplicate_of == Some(from_id) && j.id != to_id)
        {
            job.duplicate_of = Some(to_id);
            moved += 1;
        }
        moved
    }

    fn remove_job(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        if self.jobs.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.relations.retain(|r| r.job_id != id);
        // Records that pointed at the deleted job lose their duplicate status.
        for job in self.jobs.iter_mut().filter(|j| j.duplicate_of == Some(id)) {
            job.clear_duplicate();
        }
        Ok(())
    }
}

/// Process-local store. Used when no `DATABASE_URL` is configured and throughout the tests.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    state: RwLock<State>,
    fail_deletes: AtomicBool,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delete fail with a backend error.
    #[cfg(test)]
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check_delete_allowed(&self) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.jobs.iter().any(|j| j.id == record.id) {
            return Err(StoreError::Backend(format!("job {} already exists", record.id)));
        }
        state.jobs.push(record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn update(&self, record: &JobRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let slot = state
            .jobs
            .iter_mut()
            .find(|j| j.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn find_existing(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<JobRecord> = state
            .jobs
            .iter()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        found.sort_by_key(|j| (j.created_at, j.id));
        Ok(found)
    }

    async fn update_relations_bulk(&self, from_id: Uuid, to_id: Uuid) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.move_relations(from_id, to_id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_delete_allowed()?;
        let mut state = self.state.write().await;
        state.remove_job(id)
    }

    async fn merge(&self, duplicate_id: Uuid, original_id: Uuid) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let moved = staged.move_relations(duplicate_id, original_id);
        self.check_delete_allowed()?;
        staged.remove_job(duplicate_id)?;
        *state = staged;
        Ok(moved)
    }

    async fn add_relation(&self, relation: &JobRelation) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.jobs.iter().any(|j| j.id == relation.job_id) {
            return Err(StoreError::NotFound(relation.job_id));
        }
        state.relations.push(relation.clone());
        Ok(())
    }

    async fn relations_for(&self, job_id: Uuid) -> Result<Vec<JobRelation>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .relations
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }
}
