//! Generic structural extractor: finds job postings on pages no provider adapter knows.
//!
//! Everything here works on a parsed [`Html`] document that lives for exactly one pass.
//! Element handles borrow that document, so only owned [`JobDraft`]s leave a pass.

pub mod channel;
pub mod detector;
pub mod fields;
pub mod fingerprint;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::models::job::JobDraft;

pub const GENERIC_PLATFORM: &str = "generic";

/// Vocabulary looked for in class names, ids and `data-*` attributes.
pub const JOB_KEYWORDS: &[&str] = &["job", "career", "position", "opening", "vacancy", "hiring"];

/// Candidates scoring below this are never reported.
pub const MIN_CONFIDENCE: f64 = 0.4;

/// What the page side posts back to the host after a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub jobs: Vec<JobDraft>,
    pub platform: String,
}

impl HostMessage {
    pub fn generic(jobs: Vec<JobDraft>) -> Self {
        Self {
            jobs,
            platform: GENERIC_PLATFORM.to_string(),
        }
    }
}

/// Result of one extraction pass over one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub url: String,
    #[serde(flatten)]
    pub message: HostMessage,
    pub is_likely_job_page: bool,
}

/// True when the element's own class, id or `data-*` attributes mention job vocabulary.
pub(crate) fn has_job_marker(element: ElementRef<'_>) -> bool {
    let mentions_job = |text: &str| {
        let text = text.to_lowercase();
        JOB_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    };

    element.value().attrs().any(|(name, value)| match name {
        "class" | "id" => mentions_job(value),
        data if data.starts_with("data-") => mentions_job(data) || mentions_job(value),
        _ => false,
    })
}

/// Parses `html` and runs a full pass. The document is dropped before returning.
///
/// A job page with no repeating cards is read as a single-posting detail page.
pub fn extract_page(url: &str, html: &str) -> PageReport {
    let document = Html::parse_document(html);
    let is_likely_job_page = detector::is_likely_job_page(url, &document);
    let mut jobs = detector::extract_jobs(&document, Some(url));
    if jobs.is_empty() && is_likely_job_page {
        jobs.extend(detector::extract_detail(&document, Some(url)));
    }

    tracing::debug!("Extracted {} jobs from {url}", jobs.len());

    PageReport {
        url: url.to_string(),
        message: HostMessage::generic(jobs),
        is_likely_job_page,
    }
}
