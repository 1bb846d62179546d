//! Knowledge-base use-case service.
//!
//! # Responsibility
//! - Orchestrate notes import (tag derivation, duplicate policy) into any
//!   entry repository.
//! - Provide lookup, query and export entry points for callers.
//! - Own the file I/O boundary for import/export.
//!
//! # Invariants
//! - Import never stores a malformed block; those are reported instead.
//! - Under `DuplicatePolicy::Reject`, a duplicate aborts the import before
//!   any entry of that document is written.
//! - Service APIs never bypass repository validation.

use crate::model::entry::Entry;
use crate::notes::{export_document, import_document, ExportOptions, ParseError};
use crate::query::{filter, Predicate};
use crate::repo::entry_repo::{EntryRepository, RepoError};
use crate::service::tagging::TagRules;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// How import treats a reference that is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the whole import with `DuplicateReference`.
    #[default]
    Reject,
    /// Keep the first occurrence, report the rest.
    KeepFirst,
}

/// Import behavior knobs, usually loaded from the `[import]` config table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub duplicate_policy: DuplicatePolicy,
    /// Keywords that become tags when found in prompt or rationale.
    pub tag_keywords: Vec<String>,
}

/// Outcome of one document import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Document title, when the document has one.
    pub title: Option<String>,
    /// References written, in document order.
    pub stored: Vec<String>,
    /// References skipped under `DuplicatePolicy::KeepFirst`.
    pub duplicates: Vec<String>,
    /// Malformed blocks that were skipped.
    pub parse_errors: Vec<ParseError>,
}

impl ImportSummary {
    /// `true` when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.parse_errors.is_empty()
    }
}

/// Service error for knowledge-base use-cases.
#[derive(Debug)]
pub enum ServiceError {
    DuplicateReference(String),
    NotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Reading or writing a notes document failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateReference(reference) => {
                write!(f, "duplicate entry reference: {reference}")
            }
            Self::NotFound(reference) => write!(f, "entry not found: {reference}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(reference) => Self::NotFound(reference),
            RepoError::DuplicateReference(reference) => Self::DuplicateReference(reference),
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Knowledge-base facade over a repository implementation.
pub struct EntryService<R: EntryRepository> {
    repo: R,
    options: ImportOptions,
    tag_rules: TagRules,
}

impl<R: EntryRepository> EntryService<R> {
    /// Creates a service with default import options.
    pub fn new(repo: R) -> Self {
        Self::with_options(repo, ImportOptions::default())
    }

    /// Creates a service with explicit import options.
    pub fn with_options(repo: R, options: ImportOptions) -> Self {
        let tag_rules = TagRules::new(&options.tag_keywords);
        Self {
            repo,
            options,
            tag_rules,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Parses a notes document and stores its well-formed entries.
    ///
    /// # Errors
    /// - `DuplicateReference` under `DuplicatePolicy::Reject`; nothing from
    ///   this document is stored in that case.
    /// - Repository failures abort the import.
    pub fn import_text(&mut self, text: &str) -> ServiceResult<ImportSummary> {
        let started_at = Instant::now();
        let parsed = import_document(text);
        let mut summary = ImportSummary {
            title: parsed.title,
            parse_errors: parsed.errors,
            ..ImportSummary::default()
        };

        let mut accepted: Vec<Entry> = Vec::with_capacity(parsed.entries.len());
        let mut seen = HashSet::new();
        for mut entry in parsed.entries {
            let taken = !seen.insert(entry.reference.clone())
                || self.repo.contains(entry.reference.as_str())?;
            if taken {
                match self.options.duplicate_policy {
                    DuplicatePolicy::Reject => {
                        error!(
                            "event=import_document module=service status=error error_code=duplicate_reference duration_ms={}",
                            started_at.elapsed().as_millis()
                        );
                        return Err(ServiceError::DuplicateReference(entry.reference));
                    }
                    DuplicatePolicy::KeepFirst => {
                        warn!("event=import_document module=service status=duplicate_skipped");
                        summary.duplicates.push(entry.reference);
                        continue;
                    }
                }
            }

            self.tag_rules.apply(&mut entry);
            accepted.push(entry);
        }

        self.repo.put_batch(&accepted)?;
        summary.stored = accepted.into_iter().map(|entry| entry.reference).collect();

        info!(
            "event=import_document module=service status=ok stored={} duplicates={} skipped={} duration_ms={}",
            summary.stored.len(),
            summary.duplicates.len(),
            summary.parse_errors.len(),
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    /// Reads a notes document from disk and imports it.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> ServiceResult<ImportSummary> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            error!("event=import_file module=service status=error error_code=io_read_failed");
            ServiceError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.import_text(&text)
    }

    /// Appends one entry directly, with tag derivation applied.
    pub fn add_entry(&mut self, mut entry: Entry) -> ServiceResult<Entry> {
        self.tag_rules.apply(&mut entry);
        self.repo.put(&entry)?;
        Ok(entry)
    }

    /// Gets one entry. Fails with `NotFound` when absent.
    pub fn get(&self, reference: &str) -> ServiceResult<Entry> {
        Ok(self.repo.get(reference)?)
    }

    /// Looks up one entry; `None` is the normal "absent" outcome.
    pub fn find(&self, reference: &str) -> ServiceResult<Option<Entry>> {
        Ok(self.repo.find(reference)?)
    }

    /// Returns entries matching `predicate`, in insertion order.
    pub fn query(&self, predicate: &Predicate) -> ServiceResult<Vec<Entry>> {
        let entries = self.repo.all()?;
        Ok(filter(entries, predicate).collect())
    }

    /// Lists distinct tags.
    pub fn tags(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.tags()?)
    }

    /// Renders the whole store as a notes document.
    pub fn export_text(&self, options: &ExportOptions) -> ServiceResult<String> {
        Ok(export_document(self.repo.all()?, options))
    }

    /// Writes the whole store as a notes document; returns the entry count.
    pub fn export_file(
        &self,
        path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> ServiceResult<usize> {
        let path = path.as_ref();
        let count = self.repo.len()?;
        let text = self.export_text(options)?;
        std::fs::write(path, text).map_err(|source| {
            error!("event=export_file module=service status=error error_code=io_write_failed");
            ServiceError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("event=export_file module=service status=ok entries={count}");
        Ok(count)
    }
}
