use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::skills::extract_skills;
use super::{parse_json, send_for_text, FetchQuery, JobProvider, ProviderError, ProviderKind, RawPosting};
use crate::models::job::{JobDraft, JobSource};

const ADZUNA_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const MAX_RESULTS_PER_PAGE: usize = 50;
const DEFAULT_COUNTRY: &str = "in";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdzunaJob {
    pub title: Option<String>,
    pub company: Option<AdzunaCompany>,
    pub location: Option<AdzunaLocation>,
    pub description: Option<String>,
    pub redirect_url: Option<String>,
    pub url: Option<String>,
    pub category: Option<AdzunaCategory>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    /// Adzuna sends `"0"`/`"1"`.
    pub salary_is_predicted: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdzunaCompany {
    pub display_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdzunaLocation {
    pub display_name: Option<String>,
    #[serde(default)]
    pub area: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdzunaCategory {
    pub label: Option<String>,
}

pub struct AdzunaProvider {
    client: Client,
    app_id: Option<String>,
    app_key: Option<String>,
    base_url: String,
}

impl AdzunaProvider {
    pub fn new(client: Client, app_id: Option<String>, app_key: Option<String>) -> Self {
        Self::with_base_url(client, app_id, app_key, ADZUNA_URL)
    }

    pub fn with_base_url(
        client: Client,
        app_id: Option<String>,
        app_key: Option<String>,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            app_id,
            app_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Adzuna addresses each market by a country code in the URL path. City names and
/// unknown locations fall back to India.
pub fn country_code(location: Option<&str>) -> &'static str {
    let Some(location) = location else {
        return DEFAULT_COUNTRY;
    };
    match location.trim().to_lowercase().as_str() {
        "us" | "usa" | "united states" => "us",
        "gb" | "uk" | "united kingdom" => "gb",
        "in" | "india" => "in",
        "au" | "australia" => "au",
        "de" | "germany" => "de",
        "br" | "brazil" => "br",
        "fr" | "france" => "fr",
        _ => DEFAULT_COUNTRY,
    }
}

#[async_trait]
impl JobProvider for AdzunaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Adzuna
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
        let Some(app_key) = self.app_key.as_deref() else {
            return Err(ProviderError::missing_credentials(
                self.kind(),
                "ADZUNA_APP_KEY (and ADZUNA_APP_ID)",
            ));
        };
        let app_id = self.app_id.as_deref().unwrap_or(app_key);

        let country = country_code(query.location());
        let where_param = query.location().unwrap_or(country);
        let per_page = query.limit.clamp(1, MAX_RESULTS_PER_PAGE);
        let per_page_param = per_page.to_string();
        let mut drafts = Vec::new();

        for page in 1.. {
            if drafts.len() >= query.limit {
                break;
            }
            let url = format!("{}/{country}/search/{page}", self.base_url);
            debug!("Adzuna search {url}");
            let request = self.client.get(&url).query(&[
                ("app_id", app_id),
                ("app_key", app_key),
                ("results_per_page", per_page_param.as_str()),
                ("what", query.query.as_str()),
                ("where", where_param),
                ("content-type", "application/json"),
            ]);
            let body = send_for_text(self.kind(), request).await?;
            let response: SearchResponse = parse_json(self.kind(), &body)?;

            let received = response.results.len();
            drafts.extend(
                response
                    .results
                    .into_iter()
                    .map(|job| RawPosting::Adzuna(job).normalize()),
            );
            if received < per_page {
                break;
            }
        }

        drafts.truncate(query.limit);
        Ok(drafts)
    }
}

fn is_predicted(flag: Option<&Value>) -> bool {
    match flag {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

pub(crate) fn to_draft(job: AdzunaJob) -> JobDraft {
    let description = job.description.unwrap_or_default();
    let company = job
        .company
        .and_then(|c| c.display_name.or(c.name))
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let location = job
        .location
        .map(|l| l.display_name.unwrap_or_else(|| l.area.join(", ")))
        .unwrap_or_default();
    let salary_range = match (job.salary_min, job.salary_max) {
        (Some(min), Some(max)) if is_predicted(job.salary_is_predicted.as_ref()) => {
            Some(format!("{min}-{max} (estimated)"))
        }
        (Some(min), Some(max)) => Some(format!("{min}-{max}")),
        _ => None,
    };
    let skills = extract_skills(&description);

    JobDraft {
        title: job.title.unwrap_or_default(),
        company,
        location,
        description,
        source: JobSource::Adzuna,
        source_url: job.redirect_url.or(job.url),
        skills,
        experience_required: job.category.and_then(|c| c.label),
        salary_range,
        ..JobDraft::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const BODY: &str = r#"{
        "results": [
            {
                "title": "Python Developer",
                "company": {"display_name": "Initech"},
                "location": {"display_name": "Bengaluru, Karnataka", "area": ["India", "Karnataka"]},
                "description": "Flask and AWS experience required",
                "redirect_url": "https://adzuna.in/land/ad/1",
                "category": {"label": "IT Jobs"},
                "salary_min": 800000,
                "salary_max": 1200000,
                "salary_is_predicted": "1"
            },
            {
                "title": "QA Engineer",
                "location": {"area": ["India", "Pune"]},
                "description": "Manual testing"
            }
        ]
    }"#;

    #[test]
    fn test_country_code_mapping() {
        assert_eq!(country_code(None), "in");
        assert_eq!(country_code(Some("USA")), "us");
        assert_eq!(country_code(Some(" united kingdom ")), "gb");
        assert_eq!(country_code(Some("Berlin")), "in");
    }

    #[tokio::test]
    async fn test_fetch_maps_results() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/us/search/1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("app_id".into(), "id".into()),
                Matcher::UrlEncoded("results_per_page".into(), "10".into()),
                Matcher::UrlEncoded("where".into(), "usa".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let provider = AdzunaProvider::with_base_url(
            Client::new(),
            Some("id".to_string()),
            Some("key".to_string()),
            &server.url(),
        );
        let mut query = FetchQuery::new("python", 10);
        query.location = Some("usa".to_string());
        let drafts = provider.fetch(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(drafts.len(), 2);
        let first = &drafts[0];
        assert_eq!(first.company, "Initech");
        assert_eq!(first.location, "Bengaluru, Karnataka");
        assert_eq!(first.source, JobSource::Adzuna);
        assert_eq!(first.salary_range.as_deref(), Some("800000-1200000 (estimated)"));
        assert_eq!(first.experience_required.as_deref(), Some("IT Jobs"));
        assert_eq!(first.skills, vec!["Flask", "AWS"]);

        let second = &drafts[1];
        assert_eq!(second.company, "Unknown");
        assert_eq!(second.location, "India, Pune");
        assert_eq!(second.salary_range, None);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = AdzunaProvider::new(Client::new(), Some("id".to_string()), None);
        let err = provider.fetch(&FetchQuery::new("python", 10)).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredentials { .. }));
    }
}
