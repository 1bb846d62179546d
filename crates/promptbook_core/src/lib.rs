//! Core domain logic for Promptbook, a knowledge base of evaluated image
//! prompts.
//! This crate is the single source of truth for entry invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notes;
pub mod query;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AppConfig, ConfigError, ExportConfig};
pub use logging::{
    default_log_level, flush_logging, init_logging, logging_status, LoggingError,
};
pub use model::entry::{normalize_tag, Entry, EntryValidationError, Verdict};
pub use notes::{
    export_document, import_document, ExportOptions, ParseError, ParseErrorKind, ParsedDocument,
};
pub use query::{filter, EntryQuery, Predicate};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use repo::memory_repo::MemoryEntryRepository;
pub use search::fts::{search_entries, SearchError, SearchHit, SearchQuery, SearchResult};
pub use service::entry_service::{
    DuplicatePolicy, EntryService, ImportOptions, ImportSummary, ServiceError, ServiceResult,
};
pub use service::tagging::TagRules;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
