use anyhow::{Context, Result};

const DEFAULT_JOBSPY_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_JOBSPY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_JOBSPY_COUNTRY: &str = "india";
const DEFAULT_JOBSPY_SITES: &str = "indeed,linkedin,naukri";

/// Application configuration loaded from environment variables.
/// Provider credentials are optional; a provider without them fails when it is used.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub jooble_api_key: Option<String>,
    pub jobspy_api_url: String,
    pub jobspy_timeout_secs: u64,
    pub jobspy_country: String,
    pub jobspy_sites: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            google_api_key: optional_env("GOOGLE_API_KEY"),
            google_search_engine_id: optional_env("GOOGLE_SEARCH_ENGINE_ID"),
            adzuna_app_id: optional_env("ADZUNA_APP_ID"),
            adzuna_app_key: optional_env("ADZUNA_APP_KEY"),
            jooble_api_key: optional_env("JOOBLE_API_KEY"),
            jobspy_api_url: optional_env("JOBSPY_API_URL")
                .unwrap_or_else(|| DEFAULT_JOBSPY_URL.to_string()),
            jobspy_timeout_secs: optional_env("JOBSPY_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("JOBSPY_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(DEFAULT_JOBSPY_TIMEOUT_SECS),
            jobspy_country: optional_env("JOBSPY_COUNTRY")
                .unwrap_or_else(|| DEFAULT_JOBSPY_COUNTRY.to_string()),
            jobspy_sites: split_list(
                &optional_env("JOBSPY_SITES").unwrap_or_else(|| DEFAULT_JOBSPY_SITES.to_string()),
            ),
        })
    }
}

/// Reads a variable, treating unset and blank alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
impl Config {
    /// No database, no provider credentials.
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            port: 0,
            rust_log: "debug".to_string(),
            google_api_key: None,
            google_search_engine_id: None,
            adzuna_app_id: None,
            adzuna_app_key: None,
            jooble_api_key: None,
            jobspy_api_url: DEFAULT_JOBSPY_URL.to_string(),
            jobspy_timeout_secs: DEFAULT_JOBSPY_TIMEOUT_SECS,
            jobspy_country: DEFAULT_JOBSPY_COUNTRY.to_string(),
            jobspy_sites: split_list(DEFAULT_JOBSPY_SITES),
        }
    }
}
