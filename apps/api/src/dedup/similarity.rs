//! Similarity scorer: deterministic, feature-weighted comparison of two postings.
//!
//! Four symmetric comparisons, each contributing 0 when either side lacks the field:
//!
//! | field      | exact | containment | otherwise                         |
//! |------------|-------|-------------|-----------------------------------|
//! | title      | 40    | 30          | shared words / max word count × 40 |
//! | company    | 30    | 25          | 0                                 |
//! | location   | 15    | 10          | 0                                 |
//! | source URL | 15    | n/a         | 0                                 |
//!
//! Weights are not renormalized when a field is missing: title + company alone cap at 70.

use std::collections::HashSet;

use crate::models::job::{JobDraft, JobRecord};

pub const TITLE_WEIGHT: f64 = 40.0;
pub const TITLE_CONTAINS: f64 = 30.0;
pub const COMPANY_WEIGHT: f64 = 30.0;
pub const COMPANY_CONTAINS: f64 = 25.0;
pub const LOCATION_WEIGHT: f64 = 15.0;
pub const LOCATION_CONTAINS: f64 = 10.0;
pub const SOURCE_URL_WEIGHT: f64 = 15.0;

/// The four fields the scorer looks at, borrowed from a record or a draft.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchFields<'a> {
    pub title: Option<&'a str>,
    pub company: Option<&'a str>,
    pub location: Option<&'a str>,
    pub source_url: Option<&'a str>,
}

fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl<'a> From<&'a JobRecord> for MatchFields<'a> {
    fn from(record: &'a JobRecord) -> Self {
        Self {
            title: present(&record.title),
            company: present(&record.company),
            location: present(&record.location),
            source_url: record.source_url.as_deref().and_then(present),
        }
    }
}

impl<'a> From<&'a JobDraft> for MatchFields<'a> {
    fn from(draft: &'a JobDraft) -> Self {
        Self {
            title: present(&draft.title),
            company: present(&draft.company),
            location: present(&draft.location),
            source_url: draft.source_url.as_deref().and_then(present),
        }
    }
}

/// Scores two postings on a 0–100 scale. `similarity(a, b) == similarity(b, a)`.
pub fn similarity<'a, 'b>(a: impl Into<MatchFields<'a>>, b: impl Into<MatchFields<'b>>) -> u8 {
    let (a, b) = (a.into(), b.into());

    let total = title_score(a.title, b.title)
        + graded(a.company, b.company, COMPANY_WEIGHT, COMPANY_CONTAINS)
        + graded(a.location, b.location, LOCATION_WEIGHT, LOCATION_CONTAINS)
        + url_score(a.source_url, b.source_url);

    total.round().clamp(0.0, 100.0) as u8
}

fn title_score(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    if a == b {
        return TITLE_WEIGHT;
    }
    if a.contains(&b) || b.contains(&a) {
        return TITLE_CONTAINS;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let longest = words_a.len().max(words_b.len());
    if longest == 0 {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / longest as f64 * TITLE_WEIGHT
}

fn graded(a: Option<&str>, b: Option<&str>, exact: f64, contains: f64) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    if a == b {
        exact
    } else if a.contains(&b) || b.contains(&a) {
        contains
    } else {
        0.0
    }
}

fn url_score(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a == b => SOURCE_URL_WEIGHT,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(
        title: &'a str,
        company: &'a str,
        location: &'a str,
        url: Option<&'a str>,
    ) -> MatchFields<'a> {
        MatchFields {
            title: present(title),
            company: present(company),
            location: present(location),
            source_url: url.and_then(present),
        }
    }

    #[test]
    fn test_all_four_fields_identical_scores_100() {
        let a = fields("Senior Engineer", "Acme", "NYC", Some("u1"));
        assert_eq!(similarity(a, a), 100);
    }

    #[test]
    fn test_title_company_url_without_location_scores_85() {
        let a = fields("Senior Engineer", "Acme", "", Some("u1"));
        let b = fields("Senior Engineer", "Acme", "NYC", Some("u1"));
        assert_eq!(similarity(a, b), 85);

        let c = fields("Senior Engineer", "Acme", "Berlin", Some("u1"));
        assert_eq!(similarity(c, b), 85);
    }

    #[test]
    fn test_title_and_company_alone_cap_at_70() {
        let a = fields("Senior Engineer", "Acme", "", None);
        let b = fields("senior engineer", "ACME", "", Some("u2"));
        assert_eq!(similarity(a, b), 70);

        let c = fields("Senior Engineer", "Acme", "London", Some("u1"));
        let d = fields("Senior Engineer", "Acme", "Tokyo", Some("u2"));
        assert_eq!(similarity(c, d), 70);
    }

    #[test]
    fn test_title_only_match_scores_40() {
        let a = fields("Senior Engineer", "Acme", "NYC", Some("u1"));
        let b = fields("Senior Engineer", "Beta Corp", "SF", None);
        assert_eq!(similarity(a, b), 40);
    }

    #[test]
    fn test_containment_scores() {
        let a = fields("Engineer", "Acme", "New York", None);
        let b = fields("Senior Engineer", "Acme Inc", "New York, NY", None);
        // 30 + 25 + 10
        assert_eq!(similarity(a, b), 65);
    }

    #[test]
    fn test_word_overlap_is_proportional_to_longer_title() {
        let a = fields("rust backend engineer", "", "", None);
        let b = fields("python backend engineer", "", "", None);
        // 2 shared of 3 → 26.67
        assert_eq!(similarity(a, b), 27);
    }

    #[test]
    fn test_missing_fields_contribute_nothing() {
        let empty = MatchFields::default();
        let full = fields("Engineer", "Acme", "NYC", Some("u1"));
        assert_eq!(similarity(empty, full), 0);
    }

    #[test]
    fn test_url_comparison_is_exact() {
        let a = fields("", "", "", Some("https://x.com/jobs/1"));
        let b = fields("", "", "", Some("https://x.com/jobs/1/"));
        assert_eq!(similarity(a, b), 0);
    }

    #[test]
    fn test_symmetry_over_assorted_pairs() {
        let samples = [
            fields("Senior Engineer", "Acme", "NYC", Some("u1")),
            fields("Engineer", "Acme Inc", "New York", None),
            fields("Staff Software Engineer Platform", "Beta", "Remote", Some("u2")),
            fields("software engineer", "beta", "remote", Some("u2")),
            fields("Data Scientist", "", "SF", None),
            fields("a b c d e f g", "Gamma", "Austin, TX", Some("u3")),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(similarity(*a, *b), similarity(*b, *a));
            }
        }
    }
}
