//! In-memory entry repository.
//!
//! # Responsibility
//! - Hold entries for the process lifetime without any persistence.
//! - Serve `all()` lazily straight from the backing vector.
//!
//! # Invariants
//! - `index` maps every stored reference to its position in `entries`.
//! - Entries are never removed, so positions stay stable.

use crate::model::entry::Entry;
use crate::repo::entry_repo::{EntryRepository, RepoError, RepoResult};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Insertion-ordered entry store backed by a vector plus reference index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEntryRepository {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl MemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows stored entries in insertion order without cloning.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl EntryRepository for MemoryEntryRepository {
    type Iter<'a>
        = std::iter::Cloned<std::slice::Iter<'a, Entry>>
    where
        Self: 'a;

    fn put(&mut self, entry: &Entry) -> RepoResult<()> {
        self.put_batch(std::slice::from_ref(entry))
    }

    fn find(&self, reference: &str) -> RepoResult<Option<Entry>> {
        Ok(self
            .index
            .get(reference.trim())
            .map(|position| self.entries[*position].clone()))
    }

    fn contains(&self, reference: &str) -> RepoResult<bool> {
        Ok(self.index.contains_key(reference.trim()))
    }

    fn all(&self) -> RepoResult<Self::Iter<'_>> {
        Ok(self.entries.iter().cloned())
    }

    fn len(&self) -> RepoResult<usize> {
        Ok(self.entries.len())
    }

    /// Checks the whole batch before appending anything.
    fn put_batch(&mut self, entries: &[Entry]) -> RepoResult<()> {
        let mut incoming = HashSet::with_capacity(entries.len());
        for entry in entries {
            entry.validate()?;
            if self.index.contains_key(entry.reference.as_str())
                || !incoming.insert(entry.reference.as_str())
            {
                return Err(RepoError::DuplicateReference(entry.reference.clone()));
            }
        }

        for entry in entries {
            self.index
                .insert(entry.reference.clone(), self.entries.len());
            self.entries.push(entry.clone());
        }
        Ok(())
    }

    fn tags(&self) -> RepoResult<Vec<String>> {
        let tags = self
            .entries
            .iter()
            .flat_map(|entry| entry.tags.iter().cloned())
            .collect::<BTreeSet<_>>();
        Ok(tags.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MemoryEntryRepository {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
