//! Field heuristics for a single candidate element.
//!
//! Each finder walks a fixed priority list of selectors inside the candidate and then falls
//! back to text patterns. Nothing here fails: a field that cannot be found is `None` and
//! becomes a placeholder when the candidate is turned into a draft.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::has_job_marker;
use crate::models::job::{JobDraft, JobSource};

pub const TITLE_PLACEHOLDER: &str = "Untitled Position";
pub const COMPANY_PLACEHOLDER: &str = "Company Not Specified";
pub const LOCATION_PLACEHOLDER: &str = "Location Not Specified";

pub const DESCRIPTION_CAP: usize = 2000;
const MIN_CARD_TEXT: usize = 50;
const MIN_TITLE_CHARS: usize = 5;
const MAX_TITLE_CHARS: usize = 200;
const MIN_DESCRIPTION_CHARS: usize = 50;
const RICH_DESCRIPTION_CHARS: usize = 100;

/// Base score for elements found through a job-vocabulary strategy.
pub const CARD_BASE_CONFIDENCE: f64 = 0.3;
/// Base score for members of a structural cluster.
pub const PATTERN_BASE_CONFIDENCE: f64 = 0.5;

static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static TITLE_HINTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"strong, b, [class*="title"], [class*="name"]"#).unwrap()
});
static COMPANY_HINTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"[class*="company"]"#,
        r#"[class*="employer"]"#,
        r#"[class*="organization"]"#,
        "[data-company]",
        "[data-employer]",
    ])
});
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static LOCATION_HINTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"[class*="location"]"#,
        r#"[class*="city"]"#,
        r#"[class*="address"]"#,
        "[data-location]",
        "[data-city]",
    ])
});
static DESCRIPTION_HINTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"[class*="description"]"#,
        r#"[class*="summary"]"#,
        r#"[class*="details"]"#,
        r#"[class*="content"]"#,
    ])
});

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(Remote|Hybrid|On-site|Onsite)\b").unwrap(),
        Regex::new(r"\b[A-Z][a-z]+,\s*[A-Z]{2}\b").unwrap(),
        Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").unwrap(),
    ]
});

/// A job-shaped element found during one extraction pass. Borrows the parsed document, so
/// it cannot outlive the pass that produced it.
#[derive(Debug, Clone)]
pub struct CandidateElement<'a> {
    pub element: ElementRef<'a>,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub confidence: f64,
}

impl CandidateElement<'_> {
    pub fn into_draft(self, page_url: Option<&str>) -> JobDraft {
        JobDraft {
            title: self.title,
            company: self
                .company
                .unwrap_or_else(|| COMPANY_PLACEHOLDER.to_string()),
            location: self
                .location
                .unwrap_or_else(|| LOCATION_PLACEHOLDER.to_string()),
            description: self.description,
            source: JobSource::Generic,
            source_url: page_url.map(String::from),
            ..JobDraft::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text helpers
// ────────────────────────────────────────────────────────────────────────────

/// Visible text with text nodes joined by a space and whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn in_range(text: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&text.chars().count())
}

fn selectors(css: &[&str]) -> Vec<Selector> {
    css.iter().map(|css| Selector::parse(css).unwrap()).collect()
}

/// Tries `hints` in priority order. Only the first descendant matching each hint is
/// considered; its text is returned when `accept` allows it.
fn first_hint(
    scope: ElementRef<'_>,
    hints: &'static [Selector],
    accept: impl Fn(&String) -> bool,
) -> Option<String> {
    hints.iter().find_map(|hint| {
        descendants(scope, hint)
            .next()
            .map(element_text)
            .filter(|text| accept(text))
    })
}

/// Descendants of `scope` matching `selector`, excluding `scope` itself.
fn descendants<'a>(
    scope: ElementRef<'a>,
    selector: &'static Selector,
) -> impl Iterator<Item = ElementRef<'a>> {
    let scope_id = scope.id();
    scope.select(selector).filter(move |el| el.id() != scope_id)
}

// ────────────────────────────────────────────────────────────────────────────
// Finders
// ────────────────────────────────────────────────────────────────────────────

pub fn find_title(element: ElementRef<'_>) -> Option<String> {
    let in_title_range = |text: &String| in_range(text, MIN_TITLE_CHARS, MAX_TITLE_CHARS);

    descendants(element, &HEADINGS)
        .map(element_text)
        .find(in_title_range)
        .or_else(|| {
            descendants(element, &TITLE_HINTS)
                .map(element_text)
                .find(in_title_range)
        })
        .or_else(|| {
            element
                .text()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| truncate_chars(line, MAX_TITLE_CHARS))
                .filter(in_title_range)
        })
}

pub fn find_company(element: ElementRef<'_>) -> Option<String> {
    first_hint(element, &COMPANY_HINTS, |text| in_range(text, 2, 99)).or_else(|| {
        descendants(element, &LINKS)
            .filter(|link| {
                let href = link.value().attr("href").unwrap_or_default();
                !href.contains("/job") && !href.contains("/apply")
            })
            .map(element_text)
            .find(|text| in_range(text, 3, 49))
    })
}

pub fn find_location(element: ElementRef<'_>) -> Option<String> {
    if let Some(location) = first_hint(element, &LOCATION_HINTS, |text| in_range(text, 2, 99)) {
        return Some(location);
    }

    let text = element_text(element);
    LOCATION_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(&text))
        .map(|m| m.as_str().to_string())
}

/// Always yields something: the best description block, else the element's whole text.
pub fn find_description(element: ElementRef<'_>) -> String {
    first_hint(element, &DESCRIPTION_HINTS, |text| {
        text.chars().count() > MIN_DESCRIPTION_CHARS
    })
    .map(|text| truncate_chars(&text, DESCRIPTION_CAP))
    .unwrap_or_else(|| truncate_chars(&element_text(element), DESCRIPTION_CAP))
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Additive score clamped to `[0, 1]`.
pub fn confidence(
    base: f64,
    has_title: bool,
    has_company: bool,
    has_location: bool,
    description: &str,
    has_keyword: bool,
) -> f64 {
    let mut score = base;
    if has_title {
        score += 0.3;
    }
    if has_company {
        score += 0.2;
    }
    if has_location {
        score += 0.1;
    }
    if description.chars().count() > RICH_DESCRIPTION_CHARS {
        score += 0.1;
    }
    if has_keyword {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

fn extract_with_base(element: ElementRef<'_>, base: f64) -> Option<CandidateElement<'_>> {
    let title = find_title(element)?;
    let company = find_company(element);
    let location = find_location(element);
    let description = find_description(element);
    let confidence = confidence(
        base,
        true,
        company.is_some(),
        location.is_some(),
        &description,
        has_job_marker(element),
    );

    Some(CandidateElement {
        element,
        title,
        company,
        location,
        description,
        confidence,
    })
}

/// Scores an element surfaced by one of the vocabulary strategies. Elements with too little
/// text to be a posting are not considered.
pub fn extract_from_card(element: ElementRef<'_>) -> Option<CandidateElement<'_>> {
    if element_text(element).chars().count() < MIN_CARD_TEXT {
        return None;
    }
    extract_with_base(element, CARD_BASE_CONFIDENCE)
}

/// Scores a member of a structural cluster.
pub fn extract_from_pattern(element: ElementRef<'_>) -> Option<CandidateElement<'_>> {
    extract_with_base(element, PATTERN_BASE_CONFIDENCE)
}
