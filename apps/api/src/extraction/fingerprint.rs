//! Structural clustering: groups elements by shape so repeated cards are found even when
//! nothing on the page mentions jobs.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::fields::element_text;

/// Minimum number of identically shaped elements that counts as a repeating list.
pub const MIN_CLUSTER_SIZE: usize = 3;
const MIN_CHILD_ELEMENTS: usize = 2;
const MIN_TEXT_CHARS: usize = 20;

static BODY_ELEMENTS: Lazy<Selector> = Lazy::new(|| Selector::parse("body *").unwrap());

/// `(tag, child tag sequence, class token count)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuralFingerprint {
    pub tag: String,
    pub child_tags: Vec<String>,
    pub class_count: usize,
}

impl StructuralFingerprint {
    pub fn of(element: ElementRef<'_>) -> Self {
        Self {
            tag: element.value().name().to_string(),
            child_tags: element
                .children()
                .filter_map(ElementRef::wrap)
                .map(|child| child.value().name().to_string())
                .collect(),
            class_count: element.value().classes().count(),
        }
    }
}

/// Elements with enough sub-structure and text to be a card.
fn is_clusterable(element: ElementRef<'_>) -> bool {
    element.children().filter_map(ElementRef::wrap).count() >= MIN_CHILD_ELEMENTS
        && element_text(element).chars().count() >= MIN_TEXT_CHARS
}

/// Every group of at least [`MIN_CLUSTER_SIZE`] same-shaped elements, in document order
/// of each group's first member.
pub fn find_clusters(document: &Html) -> Vec<Vec<ElementRef<'_>>> {
    let mut order: Vec<StructuralFingerprint> = Vec::new();
    let mut groups: HashMap<StructuralFingerprint, Vec<ElementRef<'_>>> = HashMap::new();

    for element in document.select(&BODY_ELEMENTS) {
        if !is_clusterable(element) {
            continue;
        }
        let fingerprint = StructuralFingerprint::of(element);
        let group = groups.entry(fingerprint.clone()).or_default();
        if group.is_empty() {
            order.push(fingerprint);
        }
        group.push(element);
    }

    order
        .into_iter()
        .filter_map(|fingerprint| groups.remove(&fingerprint))
        .filter(|members| members.len() >= MIN_CLUSTER_SIZE)
        .collect()
}
