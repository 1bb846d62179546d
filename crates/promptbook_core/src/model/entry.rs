//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical record for one evaluated image/prompt pair.
//! - Validate record-level invariants before any store accepts an entry.
//!
//! # Invariants
//! - `reference` is non-empty, whitespace-free and never reused.
//! - `prompt` is non-empty after trimming.
//! - `rationale`, when present, is non-empty.
//! - `tags` are trimmed, lowercase and deduplicated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Binary quality judgment assigned by the document author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Good,
    Bad,
}

impl Verdict {
    /// Stable lowercase name used in storage and CLI input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = EntryValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "bad" => Ok(Self::Bad),
            other => Err(EntryValidationError::UnknownVerdict(other.to_string())),
        }
    }
}

/// One recorded (image, prompt, verdict, rationale, tags) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Link identifying the generated image. Unique across the store.
    pub reference: String,
    /// Generation request text.
    pub prompt: String,
    pub verdict: Verdict,
    /// Free-text justification (`note:` line in the notes document).
    pub rationale: Option<String>,
    /// Normalized keyword set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Entry {
    /// Creates an entry without rationale or tags.
    ///
    /// Inputs are trimmed; call [`Entry::validate`] before persisting.
    pub fn new(
        reference: impl Into<String>,
        prompt: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            reference: reference.into().trim().to_string(),
            prompt: prompt.into().trim().to_string(),
            verdict,
            rationale: None,
            tags: BTreeSet::new(),
        }
    }

    /// Sets the rationale; blank values clear it.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        let trimmed = rationale.trim();
        self.rationale = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Adds tags after normalization. Blank values are dropped.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_tags(tags);
        self
    }

    /// Adds tags in place after normalization.
    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            if let Some(tag) = normalize_tag(tag.as_ref()) {
                self.tags.insert(tag);
            }
        }
    }

    /// Returns whether this entry carries the given tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|tag| self.tags.contains(&tag))
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.reference.trim().is_empty() {
            return Err(EntryValidationError::EmptyReference);
        }
        if self.reference.chars().any(char::is_whitespace) {
            return Err(EntryValidationError::InvalidReference(
                self.reference.clone(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(EntryValidationError::EmptyPrompt);
        }
        if self
            .rationale
            .as_deref()
            .is_some_and(|value| value.trim().is_empty())
        {
            return Err(EntryValidationError::EmptyRationale);
        }
        if let Some(tag) = self
            .tags
            .iter()
            .find(|tag| normalize_tag(tag).as_deref() != Some(tag.as_str()))
        {
            return Err(EntryValidationError::InvalidTag(tag.clone()));
        }
        Ok(())
    }
}

/// Normalizes one tag value: trimmed lowercase, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyReference,
    InvalidReference(String),
    EmptyPrompt,
    EmptyRationale,
    InvalidTag(String),
    UnknownVerdict(String),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyReference => write!(f, "reference cannot be empty"),
            Self::InvalidReference(value) => {
                write!(f, "reference must not contain whitespace: `{value}`")
            }
            Self::EmptyPrompt => write!(f, "prompt cannot be empty"),
            Self::EmptyRationale => write!(f, "rationale cannot be blank when present"),
            Self::InvalidTag(value) => {
                write!(f, "tag must be trimmed lowercase text: `{value}`")
            }
            Self::UnknownVerdict(value) => {
                write!(f, "unknown verdict `{value}`; expected good|bad")
            }
        }
    }
}

impl Error for EntryValidationError {}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryValidationError, Verdict};

    #[test]
    fn new_trims_inputs() {
        let entry = Entry::new("  https://img/1.png ", "  a cat  ", Verdict::Good);
        assert_eq!(entry.reference, "https://img/1.png");
        assert_eq!(entry.prompt, "a cat");
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn blank_rationale_is_cleared() {
        let entry = Entry::new("r", "p", Verdict::Bad).with_rationale("   ");
        assert_eq!(entry.rationale, None);
    }

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let entry = Entry::new("r", "p", Verdict::Good).with_tags(["Faces", " faces ", "", "Light"]);
        assert_eq!(
            entry.tags.iter().cloned().collect::<Vec<_>>(),
            vec!["faces".to_string(), "light".to_string()]
        );
        assert!(entry.has_tag("FACES"));
    }

    #[test]
    fn validate_rejects_whitespace_in_reference() {
        let entry = Entry::new("two words", "p", Verdict::Good);
        assert!(matches!(
            entry.validate(),
            Err(EntryValidationError::InvalidReference(_))
        ));
    }

    #[test]
    fn validate_rejects_hand_built_uppercase_tag() {
        let mut entry = Entry::new("r", "p", Verdict::Good);
        entry.tags.insert("Upper".to_string());
        assert_eq!(
            entry.validate(),
            Err(EntryValidationError::InvalidTag("Upper".to_string()))
        );
    }

    #[test]
    fn serializes_with_snake_case_verdict() {
        let entry = Entry::new("https://img/1.png", "a cat", Verdict::Bad).with_tags(["pets"]);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["verdict"], "bad");
        assert_eq!(value["rationale"], serde_json::Value::Null);
        assert_eq!(value["tags"], serde_json::json!(["pets"]));

        let back: Entry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn verdict_parses_case_insensitively() {
        assert_eq!("GOOD".parse::<Verdict>().unwrap(), Verdict::Good);
        assert_eq!(" bad ".parse::<Verdict>().unwrap(), Verdict::Bad);
        assert!("meh".parse::<Verdict>().is_err());
    }
}
