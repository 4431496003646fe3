use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::skills::extract_skills;
use super::{parse_json, send_for_text, FetchQuery, JobProvider, ProviderError, ProviderKind, RawPosting};
use crate::models::job::{JobDraft, JobSource};

const JOOBLE_URL: &str = "https://jooble.org/api";
const SEARCH_RADIUS_KM: u32 = 25;
/// Upper bound on pages walked for one fetch.
const MAX_PAGES: u32 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    keywords: &'a str,
    location: &'a str,
    radius: u32,
    page: u32,
    search_mode: u8,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<JoobleJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoobleJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
    pub salary: Option<String>,
}

pub struct JoobleProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl JoobleProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, JOOBLE_URL)
    }

    pub fn with_base_url(client: Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl JobProvider for JoobleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Jooble
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::missing_credentials(self.kind(), "JOOBLE_API_KEY"));
        };
        let url = format!("{}/{api_key}", self.base_url);
        let mut drafts = Vec::new();

        for page in 1..=MAX_PAGES {
            if drafts.len() >= query.limit {
                break;
            }
            let body = SearchRequest {
                keywords: &query.query,
                location: query.location().unwrap_or(""),
                radius: SEARCH_RADIUS_KM,
                page,
                search_mode: 1,
            };
            let text = send_for_text(self.kind(), self.client.post(&url).json(&body)).await?;
            let response: SearchResponse = parse_json(self.kind(), &text)?;
            debug!("Jooble page {page}: {} jobs", response.jobs.len());

            if response.jobs.is_empty() {
                break;
            }
            drafts.extend(
                response
                    .jobs
                    .into_iter()
                    .map(|job| RawPosting::Jooble(job).normalize()),
            );
        }

        drafts.truncate(query.limit);
        Ok(drafts)
    }
}

pub(crate) fn to_draft(job: JoobleJob) -> JobDraft {
    let description = job.snippet.unwrap_or_default();
    let skills = extract_skills(&description);
    JobDraft {
        title: job.title.unwrap_or_default(),
        company: job
            .company
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        location: job.location.unwrap_or_default(),
        description,
        source: JobSource::Jooble,
        source_url: job.link,
        skills,
        salary_range: job.salary.filter(|s| !s.trim().is_empty()),
        ..JobDraft::default()
    }
}
