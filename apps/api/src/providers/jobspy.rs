use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::skills::extract_skills;
use super::{parse_json, send_for_text, FetchQuery, JobProvider, ProviderError, ProviderKind, RawPosting};
use crate::models::job::{JobDraft, JobSource};

/// The scraper is asked for at most this many results per site so a run finishes
/// before upstream gateways give up.
const MAX_RESULTS_WANTED: usize = 25;

/// Row fields kept in `notes`, with the key they are stored under.
const EXTRA_FIELDS: &[(&str, &str)] = &[
    ("job_type", "job_type"),
    ("date_posted", "date_posted"),
    ("is_remote", "is_remote"),
    ("job_level", "job_level"),
    ("company_industry", "company_industry"),
    ("company_url", "company_url"),
    ("company_rating", "company_rating"),
    ("interval", "salary_interval"),
    ("listing_type", "listing_type"),
];

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    search_term: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    country: String,
    results_wanted: usize,
    sites: &'a [String],
    verbose: u8,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    jobs: Vec<JobSpyRow>,
}

/// One scraped row. The scraper fills missing cells with `""`, and numeric columns may
/// arrive as numbers or strings, so every column is read through [`value_text`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSpyRow {
    #[serde(default)]
    pub site: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub company: Value,
    #[serde(default)]
    pub location: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub job_url: Value,
    #[serde(default)]
    pub job_url_direct: Value,
    #[serde(default)]
    pub skills: Value,
    #[serde(default)]
    pub experience_range: Value,
    #[serde(default)]
    pub min_amount: Value,
    #[serde(default)]
    pub max_amount: Value,
    #[serde(default)]
    pub currency: Value,
    #[serde(default)]
    pub compensation: Value,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Client for the self-hosted JobSpy scraping service (`POST /scrape`).
pub struct JobSpyProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
    default_country: String,
    default_sites: Vec<String>,
}

impl JobSpyProvider {
    pub fn new(
        client: Client,
        base_url: &str,
        timeout: Duration,
        default_country: String,
        default_sites: Vec<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            default_country,
            default_sites,
        }
    }
}

#[async_trait]
impl JobProvider for JobSpyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::JobSpy
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
        let sites = if query.sites.is_empty() {
            &self.default_sites
        } else {
            &query.sites
        };
        let request = ScrapeRequest {
            search_term: &query.query,
            location: query.location(),
            country: query
                .country
                .as_deref()
                .unwrap_or(&self.default_country)
                .to_lowercase(),
            results_wanted: query.limit.clamp(1, MAX_RESULTS_WANTED),
            sites,
            verbose: 0,
        };
        info!(
            "JobSpy scrape: '{}' on {:?} (up to {} per site)",
            request.search_term, request.sites, request.results_wanted
        );

        let url = format!("{}/scrape", self.base_url);
        // Overrides the shared client's timeout, which is shorter than a scrape may take.
        let call = send_for_text(
            self.kind(),
            self.client.post(&url).timeout(self.timeout).json(&request),
        );
        let body = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("JobSpy scrape exceeded {}s", self.timeout.as_secs());
                return Err(ProviderError::Timeout {
                    provider: self.kind(),
                    message: format!("scraper did not answer within {:?}", self.timeout),
                });
            }
        };
        let response: ScrapeResponse = parse_json(self.kind(), &body)?;

        let mut drafts: Vec<JobDraft> = response
            .jobs
            .into_iter()
            .map(|row| RawPosting::JobSpy(row).normalize())
            .collect();
        drafts.truncate(query.limit);
        Ok(drafts)
    }
}

/// Renders a scalar cell as trimmed text. Empty strings and nulls are absent; whole
/// floats drop their fraction.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn salary_range(row: &JobSpyRow) -> Option<String> {
    let currency = value_text(&row.currency).unwrap_or_else(|| "USD".to_string());
    match (value_text(&row.min_amount), value_text(&row.max_amount)) {
        (Some(min), Some(max)) => Some(format!("{currency} {min} - {max}")),
        (Some(min), None) => Some(format!("{currency} {min}+")),
        _ => value_text(&row.compensation),
    }
}

fn row_skills(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn to_draft(row: JobSpyRow) -> JobDraft {
    let platform = value_text(&row.site)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "other".to_string());
    let description =
        value_text(&row.description).unwrap_or_else(|| "No description provided.".to_string());
    let title = value_text(&row.title).unwrap_or_else(|| "Untitled".to_string());

    let mut skills = row_skills(&row.skills);
    if skills.is_empty() {
        skills = extract_skills(&format!("{title} {description}"));
    }

    let mut extra = BTreeMap::new();
    extra.insert("platform".to_string(), Value::String(platform.clone()));
    for (column, key) in EXTRA_FIELDS {
        if let Some(value) = row.rest.get(*column).filter(|v| is_present(v)) {
            extra.insert(key.to_string(), value.clone());
        }
    }

    JobDraft {
        salary_range: salary_range(&row),
        title,
        company: value_text(&row.company).unwrap_or_else(|| "Unknown".to_string()),
        location: value_text(&row.location).unwrap_or_else(|| "Not specified".to_string()),
        description,
        source: JobSource::from_site_label(&platform),
        source_url: value_text(&row.job_url_direct).or_else(|| value_text(&row.job_url)),
        skills,
        experience_required: value_text(&row.experience_range),
        notes: None,
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn provider(base_url: &str, timeout: Duration) -> JobSpyProvider {
        JobSpyProvider::new(
            Client::new(),
            base_url,
            timeout,
            "india".to_string(),
            vec!["indeed".to_string(), "linkedin".to_string(), "naukri".to_string()],
        )
    }

    #[test]
    fn test_row_mapping_preserves_extras() {
        let row: JobSpyRow = serde_json::from_value(json!({
            "site": "LinkedIn",
            "title": "Platform Engineer",
            "company": "",
            "location": "Pune",
            "description": "",
            "job_url": "https://linkedin.com/jobs/view/1",
            "job_url_direct": "",
            "skills": "Go, Terraform, ,AWS",
            "min_amount": 1500000.0,
            "max_amount": 2500000.0,
            "currency": "INR",
            "interval": "yearly",
            "is_remote": false,
            "job_type": "",
            "company_rating": 4.2,
            "emails": "hr@example.com"
        }))
        .unwrap();

        let draft = to_draft(row);
        assert_eq!(draft.source, JobSource::Linkedin);
        assert_eq!(draft.company, "Unknown");
        assert_eq!(draft.description, "No description provided.");
        assert_eq!(draft.source_url.as_deref(), Some("https://linkedin.com/jobs/view/1"));
        assert_eq!(draft.skills, vec!["Go", "Terraform", "AWS"]);
        assert_eq!(draft.salary_range.as_deref(), Some("INR 1500000 - 2500000"));
        assert_eq!(draft.extra.get("platform"), Some(&json!("linkedin")));
        assert_eq!(draft.extra.get("salary_interval"), Some(&json!("yearly")));
        assert_eq!(draft.extra.get("is_remote"), Some(&json!(false)));
        assert_eq!(draft.extra.get("company_rating"), Some(&json!(4.2)));
        assert!(!draft.extra.contains_key("job_type"));
        assert!(!draft.extra.contains_key("emails"));
    }

    #[test]
    fn test_placeholders_and_salary_variants() {
        let draft = to_draft(JobSpyRow {
            site: json!("glassdoor"),
            min_amount: json!("90000"),
            ..JobSpyRow::default()
        });
        assert_eq!(draft.title, "Untitled");
        assert_eq!(draft.location, "Not specified");
        assert_eq!(draft.source, JobSource::Other);
        assert_eq!(draft.salary_range.as_deref(), Some("USD 90000+"));

        let draft = to_draft(JobSpyRow {
            compensation: json!("Competitive"),
            skills: json!(["Rust", "", "Kafka"]),
            ..JobSpyRow::default()
        });
        assert_eq!(draft.salary_range.as_deref(), Some("Competitive"));
        assert_eq!(draft.skills, vec!["Rust", "Kafka"]);
        assert_eq!(draft.extra.get("platform"), Some(&json!("other")));
    }

    #[tokio::test]
    async fn test_fetch_posts_scrape_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/scrape")
            .match_body(Matcher::PartialJson(json!({
                "search_term": "data engineer",
                "country": "india",
                "results_wanted": 25,
                "sites": ["indeed", "linkedin", "naukri"]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobs": [
                        {"site": "naukri", "title": "Data Engineer", "company": "Acme", "location": "Delhi"},
                        {"site": "indeed", "title": "ETL Developer", "company": "Beta", "location": "Noida"}
                    ],
                    "count": 2
                })
                .to_string(),
            )
            .create_async()
            .await;

        let drafts = provider(&server.url(), Duration::from_secs(5))
            .fetch(&FetchQuery::new("data engineer", 60))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].source, JobSource::Naukri);
        assert_eq!(drafts[1].source, JobSource::Indeed);
    }

    #[tokio::test]
    async fn test_scraper_error_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/scrape")
            .with_status(500)
            .with_body(r#"{"detail":"Scrape failed: blocked"}"#)
            .create_async()
            .await;

        let err = provider(&server.url(), Duration::from_secs(5))
            .fetch(&FetchQuery::new("x", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NetworkFailure { .. }));
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn test_hard_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let err = provider(&format!("http://{addr}"), Duration::from_millis(200))
            .fetch(&FetchQuery::new("x", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }
}
