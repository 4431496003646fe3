//! Strategy cascade over a parsed page.
//!
//! Strategies run in order and the first one that yields anything wins:
//! job-vocabulary attributes, list items, article/section blocks, then structural clusters.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::fields::{extract_from_card, extract_from_pattern, CandidateElement, TITLE_PLACEHOLDER};
use super::fingerprint::find_clusters;
use super::{has_job_marker, MIN_CONFIDENCE};
use crate::models::job::JobDraft;

const KEYWORD_THRESHOLD: f64 = 0.5;
const LIST_ITEM_THRESHOLD: f64 = 0.6;
const ARTICLE_THRESHOLD: f64 = 0.5;

static BODY_ELEMENTS: Lazy<Selector> = Lazy::new(|| Selector::parse("body *").unwrap());
static LIST_ITEMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"li, div[role="listitem"]"#).unwrap());
static ARTICLES: Lazy<Selector> = Lazy::new(|| Selector::parse("article, section").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

static DETAIL_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "main",
        r#"[role="main"]"#,
        "article",
        ".content",
        ".main-content",
        "#content",
        "#main",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect()
});

static JOB_MARKED_ELEMENTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[class*="job"]"#,
        r#"[class*="career"]"#,
        r#"[class*="position"]"#,
        r#"[id*="job"]"#,
        r#"[id*="career"]"#,
        "[data-job]",
        "[data-position]",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect()
});

const URL_PATTERNS: &[&str] = &[
    "/jobs",
    "/careers",
    "/opportunities",
    "/positions",
    "/openings",
    "/vacancies",
    "/hiring",
    "/recruitment",
    "/apply",
    "/job-",
];

const TITLE_PATTERNS: &[&str] = &[
    "job",
    "career",
    "hiring",
    "position",
    "opportunity",
    "vacancy",
    "recruitment",
    "apply now",
    "we are hiring",
];

const BODY_PHRASES: &[&str] = &[
    "apply now",
    "full time",
    "part time",
    "remote",
    "salary",
    "benefits",
    "qualifications",
    "requirements",
    "job description",
];

const MIN_BODY_PHRASES: usize = 2;
const MIN_MARKED_ELEMENTS: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Candidate discovery
// ────────────────────────────────────────────────────────────────────────────

fn scored<'a>(
    elements: impl Iterator<Item = ElementRef<'a>>,
    threshold: f64,
) -> Vec<CandidateElement<'a>> {
    elements
        .filter_map(extract_from_card)
        .filter(|candidate| candidate.confidence > threshold)
        .collect()
}

fn by_job_attributes(document: &Html) -> Vec<CandidateElement<'_>> {
    scored(
        document.select(&BODY_ELEMENTS).filter(|el| has_job_marker(*el)),
        KEYWORD_THRESHOLD,
    )
}

fn by_list_items(document: &Html) -> Vec<CandidateElement<'_>> {
    scored(document.select(&LIST_ITEMS), LIST_ITEM_THRESHOLD)
}

fn by_articles(document: &Html) -> Vec<CandidateElement<'_>> {
    scored(document.select(&ARTICLES), ARTICLE_THRESHOLD)
}

fn by_structure(document: &Html) -> Vec<CandidateElement<'_>> {
    find_clusters(document)
        .into_iter()
        .flatten()
        .filter_map(extract_from_pattern)
        .collect()
}

/// Keeps one candidate per element, the highest-scoring one, in first-seen order.
fn dedupe_by_element(candidates: Vec<CandidateElement<'_>>) -> Vec<CandidateElement<'_>> {
    let mut slots: HashMap<_, usize> = HashMap::new();
    let mut kept: Vec<CandidateElement<'_>> = Vec::new();

    for candidate in candidates {
        match slots.get(&candidate.element.id()) {
            Some(&slot) => {
                if candidate.confidence > kept[slot].confidence {
                    kept[slot] = candidate;
                }
            }
            None => {
                slots.insert(candidate.element.id(), kept.len());
                kept.push(candidate);
            }
        }
    }
    kept
}

/// Every job-shaped element on the page, de-duplicated by element, before the final
/// confidence cut.
pub fn find_job_elements(document: &Html) -> Vec<CandidateElement<'_>> {
    let strategies: [(&str, fn(&Html) -> Vec<CandidateElement<'_>>); 4] = [
        ("job attributes", by_job_attributes),
        ("list items", by_list_items),
        ("articles", by_articles),
        ("structural clusters", by_structure),
    ];

    for (name, strategy) in strategies {
        let found = strategy(document);
        if !found.is_empty() {
            debug!("Extraction strategy '{name}' found {} candidates", found.len());
            return dedupe_by_element(found);
        }
    }
    Vec::new()
}

/// Drafts for every candidate at or above [`MIN_CONFIDENCE`].
pub fn extract_jobs(document: &Html, page_url: Option<&str>) -> Vec<JobDraft> {
    find_job_elements(document)
        .into_iter()
        .filter(|candidate| candidate.confidence >= MIN_CONFIDENCE)
        .map(|candidate| candidate.into_draft(page_url))
        .collect()
}

/// Extracts a single element the user pointed at. Only elements the cascade itself
/// recognises qualify.
pub fn extract_from_element(
    document: &Html,
    element: ElementRef<'_>,
    page_url: Option<&str>,
) -> Option<JobDraft> {
    find_job_elements(document)
        .into_iter()
        .find(|candidate| candidate.element.id() == element.id())
        .filter(|candidate| candidate.confidence >= MIN_CONFIDENCE)
        .map(|candidate| candidate.into_draft(page_url))
}

/// Extracts the posting from a single-job detail page: the first main-content container
/// that scores well enough, else the whole body.
pub fn extract_detail(document: &Html, page_url: Option<&str>) -> Option<JobDraft> {
    let containers = DETAIL_CONTAINERS
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .chain(document.select(&BODY).next());

    containers
        .filter_map(extract_from_card)
        .find(|candidate| {
            candidate.confidence >= MIN_CONFIDENCE && candidate.title != TITLE_PLACEHOLDER
        })
        .map(|candidate| candidate.into_draft(page_url))
}

// ────────────────────────────────────────────────────────────────────────────
// Page gating
// ────────────────────────────────────────────────────────────────────────────

fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    }
}

/// Whether the page looks like a job listing or posting. Used to decide whether capture
/// is offered, never to gate extraction.
pub fn is_likely_job_page(url: &str, document: &Html) -> bool {
    let path = url_path(url);
    if URL_PATTERNS.iter().any(|pattern| path.contains(pattern)) {
        return true;
    }

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().to_lowercase())
        .unwrap_or_default();
    if TITLE_PATTERNS.iter().any(|pattern| title.contains(pattern)) {
        return true;
    }

    let body = document
        .select(&BODY)
        .next()
        .map(|b| super::fields::element_text(b).to_lowercase())
        .unwrap_or_default();
    let phrases = BODY_PHRASES
        .iter()
        .filter(|phrase| body.contains(*phrase))
        .count();
    if phrases >= MIN_BODY_PHRASES {
        return true;
    }

    let marked: usize = JOB_MARKED_ELEMENTS
        .iter()
        .map(|selector| document.select(selector).count())
        .sum();
    marked >= MIN_MARKED_ELEMENTS
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYWORD_PAGE: &str = r#"<html><head><title>Open roles</title></head><body>
        <div class="listing">
            <div class="job-card">
                <h3>Senior Backend Engineer</h3>
                <span class="company">Acme Corporation</span>
                <span class="location">Austin, TX</span>
                <p>Build ingestion services and storage layers for our analytics product.</p>
            </div>
            <div class="job-card">
                <h3>Frontend Engineer</h3>
                <span class="company">Acme Corporation</span>
                <span class="location">Remote</span>
                <p>Ship accessible interfaces with a small product team and designers.</p>
            </div>
            <div class="job-card">
                <h3>Short</h3>
            </div>
        </div>
    </body></html>"#;

    const UNLABELLED_PAGE: &str = r#"<html><body>
        <div id="results">
            <div class="card"><h3>Analyst for data team</h3><span>acme inc</span><p>dashboards and reports</p></div>
            <div class="card"><h3>Writer for docs team</h3><span>acme inc</span><p>guides and references</p></div>
            <div class="card"><h3>Lead for sales team</h3><span>acme inc</span><p>accounts and pipeline</p></div>
        </div>
    </body></html>"#;

    #[test]
    fn test_keyword_cards_are_extracted() {
        let document = Html::parse_document(KEYWORD_PAGE);
        let jobs = extract_jobs(&document, Some("https://acme.example/careers"));

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Senior Backend Engineer");
        assert_eq!(jobs[0].company, "Acme Corporation");
        assert_eq!(jobs[0].location, "Austin, TX");
        assert_eq!(jobs[1].title, "Frontend Engineer");
        assert_eq!(jobs[1].location, "Remote");
        assert!(jobs
            .iter()
            .all(|job| job.source_url.as_deref() == Some("https://acme.example/careers")));
    }

    #[test]
    fn test_structural_fallback_without_vocabulary() {
        let document = Html::parse_document(UNLABELLED_PAGE);
        let jobs = extract_jobs(&document, None);

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].title, "Analyst for data team");
        assert_eq!(jobs[2].title, "Lead for sales team");
        assert!(jobs
            .iter()
            .all(|job| job.company == crate::extraction::fields::COMPANY_PLACEHOLDER));
    }

    #[test]
    fn test_title_only_page_yields_nothing() {
        let document =
            Html::parse_document("<html><body><div><h3>Platform Engineer</h3></div></body></html>");
        assert!(extract_jobs(&document, None).is_empty());
    }

    #[test]
    fn test_candidates_are_unique_per_element() {
        let document = Html::parse_document(
            r#"<html><body><ul>
                <li class="job-row"><h3>Site Reliability Engineer</h3><span class="company">Initech</span>
                <span class="location">Remote</span><p>Keep the fleet healthy and the pager quiet.</p></li>
            </ul></body></html>"#,
        );
        let found = find_job_elements(&document);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_single_element_extraction() {
        let document = Html::parse_document(KEYWORD_PAGE);
        let cards = Selector::parse(".job-card").unwrap();
        let mut elements = document.select(&cards);

        let first = elements.next().unwrap();
        let draft = extract_from_element(&document, first, None).unwrap();
        assert_eq!(draft.title, "Senior Backend Engineer");

        let short = elements.nth(1).unwrap();
        assert!(extract_from_element(&document, short, None).is_none());
    }

    #[test]
    fn test_detail_page_prefers_main() {
        let document = Html::parse_document(
            r#"<html><body>
                <nav>Home About</nav>
                <main>
                    <h1>Principal Engineer</h1>
                    <div class="employer">Umbrella Labs</div>
                    <div class="location">Boston, MA</div>
                    <div class="description">Lead architecture for our research platform, partner
                    with scientists, and grow a team of eight engineers across two sites.</div>
                </main>
            </body></html>"#,
        );
        let draft = extract_detail(&document, Some("https://umbrella.example/jobs/7")).unwrap();
        assert_eq!(draft.title, "Principal Engineer");
        assert_eq!(draft.company, "Umbrella Labs");
        assert_eq!(draft.location, "Boston, MA");
    }

    #[test]
    fn test_page_gating() {
        let plain = Html::parse_document(
            "<html><head><title>Home</title></head><body><p>Welcome</p></body></html>",
        );
        assert!(is_likely_job_page("https://acme.example/careers/42", &plain));
        assert!(!is_likely_job_page("https://acme.example/about", &plain));

        let titled = Html::parse_document(
            "<html><head><title>We are hiring!</title></head><body></body></html>",
        );
        assert!(is_likely_job_page("https://acme.example/", &titled));

        let phrases = Html::parse_document(
            "<html><body><p>Competitive salary and benefits.</p></body></html>",
        );
        assert!(is_likely_job_page("https://acme.example/", &phrases));

        let one_phrase =
            Html::parse_document("<html><body><p>Great benefits.</p></body></html>");
        assert!(!is_likely_job_page("https://acme.example/", &one_phrase));

        let marked = Html::parse_document(KEYWORD_PAGE.replace("Open roles", "Acme").as_str());
        assert!(is_likely_job_page("https://acme.example/", &marked));
    }
}
