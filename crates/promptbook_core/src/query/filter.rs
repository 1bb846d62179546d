//! Composable entry predicates and lazy filtering.
//!
//! # Responsibility
//! - Express verdict, tag and substring conditions as one predicate tree.
//! - Filter any entry sequence lazily, keeping its order.
//!
//! # Invariants
//! - Text and tag matching are case-insensitive.
//! - An empty result is a valid outcome, never an error.

use crate::model::entry::{normalize_tag, Entry, Verdict};
use std::borrow::Borrow;
use std::ops::Not;

/// Condition over a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every entry.
    Always,
    Verdict(Verdict),
    /// Tag name, stored normalized.
    Tag(String),
    /// Case-insensitive substring of the prompt.
    PromptContains(String),
    /// Case-insensitive substring of the rationale. Never matches when the
    /// entry has no rationale.
    RationaleContains(String),
    /// Case-insensitive substring of the prompt or the rationale.
    TextContains(String),
    Not(Box<Predicate>),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn verdict(verdict: Verdict) -> Self {
        Self::Verdict(verdict)
    }

    /// Blank tags collapse to [`Predicate::Always`].
    pub fn tag(tag: &str) -> Self {
        normalize_tag(tag).map_or(Self::Always, Self::Tag)
    }

    pub fn prompt_contains(needle: &str) -> Self {
        Self::PromptContains(needle.to_lowercase())
    }

    pub fn rationale_contains(needle: &str) -> Self {
        Self::RationaleContains(needle.to_lowercase())
    }

    pub fn text_contains(needle: &str) -> Self {
        Self::TextContains(needle.to_lowercase())
    }

    /// Conjunction; flattens nested `All` nodes.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Always, other) | (other, Self::Always) => other,
            (Self::All(mut left), Self::All(right)) => {
                left.extend(right);
                Self::All(left)
            }
            (Self::All(mut left), other) => {
                left.push(other);
                Self::All(left)
            }
            (this, other) => Self::All(vec![this, other]),
        }
    }

    /// Disjunction; flattens nested `Any` nodes.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Any(mut left), Self::Any(right)) => {
                left.extend(right);
                Self::Any(left)
            }
            (Self::Any(mut left), other) => {
                left.push(other);
                Self::Any(left)
            }
            (this, other) => Self::Any(vec![this, other]),
        }
    }

    /// Evaluates this predicate against one entry.
    ///
    /// Hand-built variants holding mixed-case text match the same as the
    /// constructor forms.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::Always => true,
            Self::Verdict(verdict) => entry.verdict == *verdict,
            Self::Tag(tag) => entry.has_tag(tag),
            Self::PromptContains(needle) => contains_folded(&entry.prompt, needle),
            Self::RationaleContains(needle) => entry
                .rationale
                .as_deref()
                .is_some_and(|rationale| contains_folded(rationale, needle)),
            Self::TextContains(needle) => {
                contains_folded(&entry.prompt, needle)
                    || entry
                        .rationale
                        .as_deref()
                        .is_some_and(|rationale| contains_folded(rationale, needle))
            }
            Self::Not(inner) => !inner.matches(entry),
            Self::All(items) => items.iter().all(|item| item.matches(entry)),
            Self::Any(items) => items.iter().any(|item| item.matches(entry)),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

/// Lazy iterator returned by [`filter`].
#[derive(Debug, Clone)]
pub struct Matching<'p, It> {
    inner: It,
    predicate: &'p Predicate,
}

impl<It> Iterator for Matching<'_, It>
where
    It: Iterator,
    It::Item: Borrow<Entry>,
{
    type Item = It::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let predicate = self.predicate;
        self.inner.find(|entry| predicate.matches(entry.borrow()))
    }
}

/// Lazily yields the entries matching `predicate`, in input order.
///
/// Works over owned entries (`EntryRepository::all`) and borrowed ones
/// (`&MemoryEntryRepository`) alike.
pub fn filter<I>(entries: I, predicate: &Predicate) -> Matching<'_, I::IntoIter>
where
    I: IntoIterator,
    I::Item: Borrow<Entry>,
{
    Matching {
        inner: entries.into_iter(),
        predicate,
    }
}

/// Flat query shape used by callers that take options rather than trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub verdict: Option<Verdict>,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
    /// Substring of prompt or rationale.
    pub text: Option<String>,
}

impl EntryQuery {
    /// Lowers this query into a predicate tree.
    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::Always;
        if let Some(verdict) = self.verdict {
            predicate = predicate.and(Predicate::verdict(verdict));
        }
        for tag in &self.tags {
            predicate = predicate.and(Predicate::tag(tag));
        }
        if let Some(text) = self.text.as_deref().filter(|text| !text.trim().is_empty()) {
            predicate = predicate.and(Predicate::text_contains(text.trim()));
        }
        predicate
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
