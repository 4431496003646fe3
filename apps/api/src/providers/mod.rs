//! Provider adapters, one per external job source.
//!
//! Every adapter deserializes its provider's payload into a typed raw shape, wraps it in a
//! [`RawPosting`] variant and maps it to a [`JobDraft`] through [`RawPosting::normalize`].
//! Credentials are owned by each adapter; a missing credential surfaces as
//! [`ProviderError::MissingCredentials`] when `fetch` is called, never at startup.

pub mod adzuna;
pub mod google;
pub mod indeed_rss;
pub mod jobspy;
pub mod jooble;
pub mod skills;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::job::JobDraft;

pub const DEFAULT_QUERY: &str = "software engineer";
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    Google,
    Adzuna,
    Jooble,
    IndeedRss,
    #[serde(rename = "JOBSPY")]
    JobSpy,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "GOOGLE",
            ProviderKind::Adzuna => "ADZUNA",
            ProviderKind::Jooble => "JOOBLE",
            ProviderKind::IndeedRss => "INDEED_RSS",
            ProviderKind::JobSpy => "JOBSPY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: credentials not configured ({message})")]
    MissingCredentials {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: rate limit exceeded ({message})")]
    RateLimited {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: request failed ({message})")]
    NetworkFailure {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: malformed response ({message})")]
    MalformedResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: timed out ({message})")]
    Timeout {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::MissingCredentials { provider, .. }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::NetworkFailure { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::Timeout { provider, .. } => *provider,
        }
    }

    pub fn missing_credentials(provider: ProviderKind, names: &str) -> Self {
        ProviderError::MissingCredentials {
            provider,
            message: format!("set {names}"),
        }
    }

    pub fn malformed(provider: ProviderKind, message: impl fmt::Display) -> Self {
        ProviderError::MalformedResponse {
            provider,
            message: message.to_string(),
        }
    }

    /// Classifies a transport-level `reqwest` failure.
    pub fn from_transport(provider: ProviderKind, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ProviderError::malformed(provider, err)
        } else {
            ProviderError::NetworkFailure {
                provider,
                message: err.to_string(),
            }
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(provider: ProviderKind, status: StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status.as_u16(), truncate(body, 200));
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { provider, message },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::MissingCredentials { provider, message }
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::Timeout { provider, message }
            }
            _ => ProviderError::NetworkFailure { provider, message },
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Sends a request and returns the body of a successful response, classifying every failure.
pub(crate) async fn send_for_text(
    provider: ProviderKind,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_transport(provider, e))?;
    if !status.is_success() {
        return Err(ProviderError::from_status(provider, status, &body));
    }
    Ok(body)
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    provider: ProviderKind,
    body: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, e))
}

/// One fetch request as seen by an adapter.
#[derive(Debug, Clone)]
pub struct FetchQuery {
    pub query: String,
    pub location: Option<String>,
    pub limit: usize,
    /// Scraping-service sites; empty means the configured default.
    pub sites: Vec<String>,
    /// Scraping-service country; `None` means the configured default.
    pub country: Option<String>,
}

impl FetchQuery {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            location: None,
            limit,
            sites: Vec::new(),
            country: None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait JobProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError>;
}

/// A provider payload item before it is mapped into the canonical draft shape.
#[derive(Debug, Clone)]
pub enum RawPosting {
    Google {
        item: google::GoogleItem,
        requested_location: Option<String>,
    },
    Adzuna(adzuna::AdzunaJob),
    Jooble(jooble::JoobleJob),
    IndeedRss {
        item: indeed_rss::RssItem,
        requested_location: Option<String>,
    },
    JobSpy(jobspy::JobSpyRow),
}

impl RawPosting {
    pub fn normalize(self) -> JobDraft {
        match self {
            RawPosting::Google {
                item,
                requested_location,
            } => google::to_draft(item, requested_location.as_deref()),
            RawPosting::Adzuna(job) => adzuna::to_draft(job),
            RawPosting::Jooble(job) => jooble::to_draft(job),
            RawPosting::IndeedRss {
                item,
                requested_location,
            } => indeed_rss::to_draft(item, requested_location.as_deref()),
            RawPosting::JobSpy(row) => jobspy::to_draft(row),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Multi-source orchestration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderWarning {
    pub provider: ProviderKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct MultiFetch {
    pub drafts: Vec<JobDraft>,
    pub warnings: Vec<ProviderWarning>,
}

/// Adapters keyed by kind, shared through `AppState`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn JobProvider>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(concat!("job-intake/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::default()
            .with(Arc::new(google::GoogleProvider::new(
                client.clone(),
                config.google_api_key.clone(),
                config.google_search_engine_id.clone(),
            )))
            .with(Arc::new(adzuna::AdzunaProvider::new(
                client.clone(),
                config.adzuna_app_id.clone(),
                config.adzuna_app_key.clone(),
            )))
            .with(Arc::new(jooble::JoobleProvider::new(
                client.clone(),
                config.jooble_api_key.clone(),
            )))
            .with(Arc::new(indeed_rss::IndeedRssProvider::new(client.clone())))
            .with(Arc::new(jobspy::JobSpyProvider::new(
                client,
                &config.jobspy_api_url,
                Duration::from_secs(config.jobspy_timeout_secs),
                config.jobspy_country.clone(),
                config.jobspy_sites.clone(),
            ))))
    }

    pub fn with(mut self, provider: Arc<dyn JobProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn JobProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Fetches from every requested provider concurrently.
    ///
    /// A failing or unregistered provider becomes a warning; the drafts are the union of
    /// whatever succeeded, concatenated in the order the kinds were requested.
    pub async fn fetch_many(&self, kinds: &[ProviderKind], query: &FetchQuery) -> MultiFetch {
        let futures = kinds.iter().map(|&kind| {
            let provider = self.get(kind);
            async move {
                match provider {
                    Some(provider) => (kind, provider.fetch(query).await),
                    None => (
                        kind,
                        Err(ProviderError::NetworkFailure {
                            provider: kind,
                            message: "provider not registered".to_string(),
                        }),
                    ),
                }
            }
        });

        let mut outcome = MultiFetch::default();
        for (kind, result) in join_all(futures).await {
            match result {
                Ok(drafts) => {
                    info!("{kind}: fetched {} jobs", drafts.len());
                    outcome.drafts.extend(drafts);
                }
                Err(e) => {
                    warn!("Provider fetch failed: {e}");
                    outcome.warnings.push(ProviderWarning {
                        provider: kind,
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}
