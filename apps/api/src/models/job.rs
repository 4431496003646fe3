#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Where a posting came from. Closed set: unknown provider labels land on `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSource {
    Linkedin,
    Indeed,
    Naukri,
    Adzuna,
    Jooble,
    Generic,
    #[default]
    Other,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Linkedin => "LINKEDIN",
            JobSource::Indeed => "INDEED",
            JobSource::Naukri => "NAUKRI",
            JobSource::Adzuna => "ADZUNA",
            JobSource::Jooble => "JOOBLE",
            JobSource::Generic => "GENERIC",
            JobSource::Other => "OTHER",
        }
    }

    /// Maps a provider "site" label (e.g. JobSpy's `site` column) into the closed enum.
    pub fn from_site_label(site: &str) -> Self {
        match site.trim().to_lowercase().as_str() {
            "linkedin" => JobSource::Linkedin,
            "indeed" => JobSource::Indeed,
            "naukri" => JobSource::Naukri,
            _ => JobSource::Other,
        }
    }

    /// Detects the board a result URL points at.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("linkedin.com") {
            JobSource::Linkedin
        } else if lower.contains("indeed.com") {
            JobSource::Indeed
        } else if lower.contains("naukri.com") {
            JobSource::Naukri
        } else {
            JobSource::Other
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LINKEDIN" => Ok(JobSource::Linkedin),
            "INDEED" => Ok(JobSource::Indeed),
            "NAUKRI" => Ok(JobSource::Naukri),
            "ADZUNA" => Ok(JobSource::Adzuna),
            "JOOBLE" => Ok(JobSource::Jooble),
            "GENERIC" => Ok(JobSource::Generic),
            "OTHER" => Ok(JobSource::Other),
            other => Err(format!("unknown job source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Active,
    Paused,
    Closed,
    Filled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "ACTIVE",
            JobStatus::Paused => "PAUSED",
            JobStatus::Closed => "CLOSED",
            JobStatus::Filled => "FILLED",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(JobStatus::Active),
            "PAUSED" => Ok(JobStatus::Paused),
            "CLOSED" => Ok(JobStatus::Closed),
            "FILLED" => Ok(JobStatus::Filled),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Canonical, not-yet-deduplicated posting produced by a provider adapter or the
/// structural extractor.
///
/// Fields a provider returns that have no canonical column are collected in `extra`
/// and folded into `notes` by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub source: JobSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A stored posting.
///
/// `duplicate_of` is `Some` exactly when `is_duplicate` is true; use
/// [`JobRecord::mark_duplicate`] and [`JobRecord::clear_duplicate`] to change either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub source: JobSource,
    pub source_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_required: Option<String>,
    pub salary_range: Option<String>,
    pub notes: Option<String>,
    pub status: JobStatus,
    pub recruiter_id: Option<Uuid>,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    pub similarity_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Builds a fresh record from a normalized draft. Duplicate status starts cleared.
    pub fn from_draft(draft: JobDraft, recruiter_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            company: draft.company,
            location: draft.location,
            description: draft.description,
            source: draft.source,
            source_url: draft.source_url,
            skills: draft.skills,
            experience_required: draft.experience_required,
            salary_range: draft.salary_range,
            notes: draft.notes,
            status: JobStatus::Active,
            recruiter_id,
            is_duplicate: false,
            duplicate_of: None,
            similarity_score: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_duplicate(&mut self, original_id: Uuid, score: u8) {
        self.is_duplicate = true;
        self.duplicate_of = Some(original_id);
        self.similarity_score = Some(score.min(100));
    }

    pub fn clear_duplicate(&mut self) {
        self.is_duplicate = false;
        self.duplicate_of = None;
        self.similarity_score = None;
    }
}

/// Kinds of rows elsewhere in the CRM that point at a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Application,
    Assignment,
    Activity,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Application => "application",
            RelationKind::Assignment => "assignment",
            RelationKind::Activity => "activity",
        }
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(RelationKind::Application),
            "assignment" => Ok(RelationKind::Assignment),
            "activity" => Ok(RelationKind::Activity),
            other => Err(format!("unknown relation kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRelation {
    pub id: Uuid,
    pub job_id: Uuid,
    pub kind: RelationKind,
}

/// Derived view: one original plus every record whose `duplicate_of` resolves to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub original: JobRecord,
    pub duplicates: Vec<JobRecord>,
}

/// Flat row consumed by the reporting UI's CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub source: JobSource,
    pub status: JobStatus,
    pub skills: String,
    pub experience_required: String,
    pub salary_range: String,
    pub recruiter: String,
    pub application_count: u64,
    pub created_at: DateTime<Utc>,
    pub is_duplicate: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub source: String,
    pub source_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_required: Option<String>,
    pub salary_range: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub recruiter_id: Option<Uuid>,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    pub similarity_score: Option<i16>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(JobRecord {
            id: row.id,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            source: row.source.parse()?,
            source_url: row.source_url,
            skills: row.skills,
            experience_required: row.experience_required,
            salary_range: row.salary_range,
            notes: row.notes,
            status: row.status.parse()?,
            recruiter_id: row.recruiter_id,
            is_duplicate: row.is_duplicate,
            duplicate_of: row.duplicate_of,
            similarity_score: row
                .similarity_score
                .map(|s| s.clamp(0, 100) as u8),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRelationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub kind: String,
}

impl TryFrom<JobRelationRow> for JobRelation {
    type Error = String;

    fn try_from(row: JobRelationRow) -> Result<Self, Self::Error> {
        Ok(JobRelation {
            id: row.id,
            job_id: row.job_id,
            kind: row.kind.parse()?,
        })
    }
}
