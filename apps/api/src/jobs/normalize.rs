use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use thiserror::Error;

use crate::models::job::JobDraft;
use crate::providers::skills::extract_skills;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("'{0}' must not be empty")]
    MissingField(&'static str),
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|v| !v.is_empty())
}

/// Trims, drops blank entries and repeats (case-insensitive, first spelling wins).
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(trimmed)
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

/// Serializes `extra` (plus any existing free-text notes) as a JSON object with sorted keys.
fn fold_notes(notes: Option<String>, extra: BTreeMap<String, Value>) -> Option<String> {
    let mut bag: BTreeMap<String, Value> = extra
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    if bag.is_empty() {
        return notes;
    }

    if let Some(notes) = notes {
        match serde_json::from_str::<BTreeMap<String, Value>>(&notes) {
            Ok(existing) => {
                for (key, value) in existing {
                    bag.entry(key).or_insert(value);
                }
            }
            Err(_) => {
                bag.insert("notes".to_string(), Value::String(notes));
            }
        }
    }
    serde_json::to_string(&bag).ok()
}

/// Canonicalizes a draft from any source. Pure and idempotent.
///
/// Provider fields with no canonical column end up in `notes`, so nothing is dropped.
/// A draft without skills gets them from the skill vocabulary.
pub fn normalize(draft: JobDraft) -> JobDraft {
    let title = trimmed(draft.title);
    let description = trimmed(draft.description);
    let mut skills = clean_list(draft.skills);
    if skills.is_empty() {
        skills = extract_skills(&format!("{title} {description}"));
    }

    JobDraft {
        company: trimmed(draft.company),
        location: trimmed(draft.location),
        source: draft.source,
        source_url: trimmed_opt(draft.source_url),
        experience_required: trimmed_opt(draft.experience_required),
        salary_range: trimmed_opt(draft.salary_range),
        notes: fold_notes(trimmed_opt(draft.notes), draft.extra),
        extra: BTreeMap::new(),
        title,
        description,
        skills,
    }
}

pub fn require_present(name: &'static str, value: &str) -> Result<(), DraftError> {
    if value.trim().is_empty() {
        return Err(DraftError::MissingField(name));
    }
    Ok(())
}

/// Checks the fields every stored job must carry. Placeholders count as present.
pub fn validate(draft: &JobDraft) -> Result<(), DraftError> {
    require_present("title", &draft.title)?;
    require_present("company", &draft.company)?;
    require_present("location", &draft.location)?;
    require_present("description", &draft.description)
}
