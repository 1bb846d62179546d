//! Keyword-based tag derivation.
//!
//! # Responsibility
//! - Turn configured keywords into tags when they occur in an entry's prompt
//!   or rationale.
//!
//! # Invariants
//! - Matching is case-insensitive and on whole words only.
//! - Derived tags are normalized like any other tag.

use crate::model::entry::{normalize_tag, Entry};
use log::warn;
use regex::Regex;

/// Compiled keyword rules.
#[derive(Debug, Clone, Default)]
pub struct TagRules {
    rules: Vec<(String, Regex)>,
}

impl TagRules {
    /// Compiles keyword rules. Blank and duplicate keywords are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules: Vec<(String, Regex)> = Vec::new();
        for keyword in keywords {
            let Some(tag) = normalize_tag(keyword.as_ref()) else {
                continue;
            };
            if rules.iter().any(|(existing, _)| *existing == tag) {
                continue;
            }
            match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&tag))) {
                Ok(re) => rules.push((tag, re)),
                Err(err) => warn!(
                    "event=tag_rule_compile module=service status=error error={}",
                    err
                ),
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns keywords found in the entry's prompt or rationale.
    pub fn derive(&self, entry: &Entry) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(_, re)| {
                re.is_match(&entry.prompt)
                    || entry
                        .rationale
                        .as_deref()
                        .is_some_and(|rationale| re.is_match(rationale))
            })
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// Adds derived tags to the entry in place.
    pub fn apply(&self, entry: &mut Entry) {
        let derived = self.derive(entry);
        entry.add_tags(derived);
    }
}
