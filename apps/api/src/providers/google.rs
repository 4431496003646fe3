use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::skills::extract_skills;
use super::{parse_json, send_for_text, FetchQuery, JobProvider, ProviderError, ProviderKind, RawPosting};
use crate::models::job::{JobDraft, JobSource};

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
/// Custom Search never returns more than 10 items per request.
const PAGE_SIZE: usize = 10;
const SITE_FILTER: &str = "site:linkedin.com/jobs OR site:indeed.com/jobs OR site:glassdoor.com/Job \
                           OR site:monster.com/jobs OR site:ziprecruiter.com/jobs";

static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(job|hiring|position):\s*").unwrap());
static TITLE_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+-\s+.*$").unwrap());
static DOMAIN_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(com|org|net|io)$").unwrap());
static SNIPPET_LOCATIONS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\b(?:in|at|near)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap(),
        Regex::new(r"([A-Z][a-z]+,\s*[A-Z]{2})\b").unwrap(),
        Regex::new(r"([A-Z][a-z]+,\s*[A-Z][a-z]+)").unwrap(),
    ]
});

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    pub display_link: Option<String>,
    pub snippet: Option<String>,
    pub html_snippet: Option<String>,
}

/// Google Custom Search restricted to the big job boards.
pub struct GoogleProvider {
    client: Client,
    api_key: Option<String>,
    engine_id: Option<String>,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(client: Client, api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self::with_base_url(client, api_key, engine_id, GOOGLE_SEARCH_URL)
    }

    pub fn with_base_url(
        client: Client,
        api_key: Option<String>,
        engine_id: Option<String>,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            api_key,
            engine_id,
            base_url: base_url.to_string(),
        }
    }

    fn search_query(query: &FetchQuery) -> String {
        match query.location() {
            Some(location) => format!("{} jobs {location} {SITE_FILTER}", query.query),
            None => format!("{} jobs {SITE_FILTER}", query.query),
        }
    }
}

#[async_trait]
impl JobProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
        let (Some(api_key), Some(engine_id)) = (&self.api_key, &self.engine_id) else {
            return Err(ProviderError::missing_credentials(
                self.kind(),
                "GOOGLE_API_KEY and GOOGLE_SEARCH_ENGINE_ID",
            ));
        };

        let q = Self::search_query(query);
        let requested_location = query.location().map(String::from);
        let mut drafts = Vec::new();

        for page in 0.. {
            if drafts.len() >= query.limit {
                break;
            }
            let num = PAGE_SIZE.min(query.limit - drafts.len());
            let start = page * PAGE_SIZE + 1;
            debug!("Google search page {page} (start={start}, num={num})");

            let (num_param, start_param) = (num.to_string(), start.to_string());
            let request = self.client.get(&self.base_url).query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", q.as_str()),
                ("num", num_param.as_str()),
                ("start", start_param.as_str()),
            ]);
            let body = send_for_text(self.kind(), request).await?;
            let response: SearchResponse = parse_json(self.kind(), &body)?;

            let received = response.items.len();
            drafts.extend(response.items.into_iter().map(|item| {
                RawPosting::Google {
                    item,
                    requested_location: requested_location.clone(),
                }
                .normalize()
            }));
            if received < num {
                break;
            }
        }

        drafts.truncate(query.limit);
        Ok(drafts)
    }
}

pub(crate) fn to_draft(item: GoogleItem, requested_location: Option<&str>) -> JobDraft {
    let description = item
        .snippet
        .clone()
        .or_else(|| item.html_snippet.clone())
        .unwrap_or_default();
    let location = match requested_location {
        Some(location) => location.to_string(),
        None => location_from_snippet(&description).unwrap_or_default(),
    };
    let skills = extract_skills(&description);

    JobDraft {
        title: clean_title(&item.title),
        company: company_from_title(&item.title, item.display_link.as_deref()),
        location,
        description,
        source: JobSource::from_url(&item.link),
        source_url: (!item.link.is_empty()).then(|| item.link.clone()),
        skills,
        ..JobDraft::default()
    }
}

/// Strips `Job:`/`Hiring:`/`Position:` prefixes and a trailing ` - Company - Location`.
fn clean_title(title: &str) -> String {
    let without_prefix = TITLE_PREFIX.replace(title, "");
    TITLE_TRAILER.replace(&without_prefix, "").trim().to_string()
}

/// `Title - Company - Location` yields the second-to-last segment; otherwise the bare
/// display domain.
fn company_from_title(title: &str, display_link: Option<&str>) -> String {
    let parts: Vec<&str> = title.split(" - ").collect();
    if parts.len() >= 2 {
        let candidate = parts[parts.len() - 2].trim();
        let fallback = parts[parts.len() - 1].trim();
        return if candidate.is_empty() { fallback } else { candidate }.to_string();
    }
    match display_link {
        Some(link) => {
            let host = link.trim().trim_start_matches("www.");
            DOMAIN_SUFFIX.replace(host, "").into_owned()
        }
        None => "Unknown".to_string(),
    }
}

fn location_from_snippet(snippet: &str) -> Option<String> {
    SNIPPET_LOCATIONS
        .iter()
        .find_map(|pattern| pattern.captures(snippet))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
