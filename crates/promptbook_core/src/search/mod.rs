//! Full-text search entry points for the persisted store.
//!
//! # Responsibility
//! - Expose keyword search backed by the `entries_fts` FTS5 index.

pub mod fts;
