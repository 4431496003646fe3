use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{JobFilter, JobStore, StoreError};
use crate::models::job::{JobRecord, JobRelation, JobRelationRow, JobRow};

/// PostgreSQL-backed gateway. Schema lives in `migrations/0001_jobs.sql`.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_record(row: JobRow) -> Result<JobRecord, StoreError> {
    JobRecord::try_from(row).map_err(StoreError::InvalidRow)
}

const MOVE_RELATIONS_SQL: &str = "UPDATE job_relations SET job_id = $2 WHERE job_id = $1";
const MOVE_DUPLICATE_POINTERS_SQL: &str =
    "UPDATE jobs SET duplicate_of = $2 WHERE duplicate_of = $1 AND id <> $2";
const CLEAR_DANGLING_MARKS_SQL: &str = r#"
    UPDATE jobs
    SET is_duplicate = FALSE, duplicate_of = NULL, similarity_score = NULL
    WHERE duplicate_of = $1
"#;
const DELETE_JOB_SQL: &str = "DELETE FROM jobs WHERE id = $1";

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, title, company, location, description, source, source_url, skills,
                 experience_required, salary_range, notes, status, recruiter_id,
                 is_duplicate, duplicate_of, similarity_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.description)
        .bind(record.source.as_str())
        .bind(&record.source_url)
        .bind(&record.skills)
        .bind(&record.experience_required)
        .bind(&record.salary_range)
        .bind(&record.notes)
        .bind(record.status.as_str())
        .bind(record.recruiter_id)
        .bind(record.is_duplicate)
        .bind(record.duplicate_of)
        .bind(record.similarity_score.map(i16::from))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_record)
            .transpose()
    }

    async fn update(&self, record: &JobRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                title = $2, company = $3, location = $4, description = $5, source = $6,
                source_url = $7, skills = $8, experience_required = $9, salary_range = $10,
                notes = $11, status = $12, recruiter_id = $13, is_duplicate = $14,
                duplicate_of = $15, similarity_score = $16
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.description)
        .bind(record.source.as_str())
        .bind(&record.source_url)
        .bind(&record.skills)
        .bind(&record.experience_required)
        .bind(&record.salary_range)
        .bind(&record.notes)
        .bind(record.status.as_str())
        .bind(record.recruiter_id)
        .bind(record.is_duplicate)
        .bind(record.duplicate_of)
        .bind(record.similarity_score.map(i16::from))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        Ok(())
    }

    async fn find_existing(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM jobs WHERE TRUE");
        if let Some(flag) = filter.is_duplicate {
            query.push(" AND is_duplicate = ").push_bind(flag);
        }
        if let Some(id) = filter.exclude_id {
            query.push(" AND id <> ").push_bind(id);
        }
        if let Some(target) = filter.duplicate_of {
            query.push(" AND duplicate_of = ").push_bind(target);
        }
        if let Some(recruiter) = filter.recruiter_id {
            query.push(" AND recruiter_id = ").push_bind(recruiter);
        }
        if let Some(source) = filter.source {
            query.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", search.to_lowercase());
            query
                .push(" AND (LOWER(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(company) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(location) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let rows = query
            .build_query_as::<JobRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(into_record).collect()
    }

    async fn update_relations_bulk(&self, from_id: Uuid, to_id: Uuid) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let relations = sqlx::query(MOVE_RELATIONS_SQL)
            .bind(from_id)
            .bind(to_id)
            .execute(&mut *tx)
            .await?;
        let pointers = sqlx::query(MOVE_DUPLICATE_POINTERS_SQL)
            .bind(from_id)
            .bind(to_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(relations.rows_affected() + pointers.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(CLEAR_DANGLING_MARKS_SQL)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        // job_relations cascade on delete
        let deleted = sqlx::query(DELETE_JOB_SQL)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn merge(&self, duplicate_id: Uuid, original_id: Uuid) -> Result<u64, StoreError> {
        // Dropping `tx` on any early return rolls the whole merge back.
        let mut tx = self.pool.begin().await?;
        let relations = sqlx::query(MOVE_RELATIONS_SQL)
            .bind(duplicate_id)
            .bind(original_id)
            .execute(&mut *tx)
            .await?;
        let pointers = sqlx::query(MOVE_DUPLICATE_POINTERS_SQL)
            .bind(duplicate_id)
            .bind(original_id)
            .execute(&mut *tx)
            .await?;
        // Only the kept record can still point here; it stops being a duplicate.
        sqlx::query(CLEAR_DANGLING_MARKS_SQL)
            .bind(duplicate_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query(DELETE_JOB_SQL)
            .bind(duplicate_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(duplicate_id));
        }
        tx.commit().await?;

        let moved = relations.rows_affected() + pointers.rows_affected();
        info!("Merged job {duplicate_id} into {original_id} ({moved} references moved)");
        Ok(moved)
    }

    async fn add_relation(&self, relation: &JobRelation) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO job_relations (id, job_id, kind) VALUES ($1, $2, $3)")
            .bind(relation.id)
            .bind(relation.job_id)
            .bind(relation.kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn relations_for(&self, job_id: Uuid) -> Result<Vec<JobRelation>, StoreError> {
        let rows = sqlx::query_as::<_, JobRelationRow>(
            "SELECT id, job_id, kind FROM job_relations WHERE job_id = $1 ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| JobRelation::try_from(row).map_err(StoreError::InvalidRow))
            .collect()
    }
}
