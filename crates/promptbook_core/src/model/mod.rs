//! Domain model for evaluated prompts.
//!
//! # Responsibility
//! - Define the canonical `Entry` record shared by store, query and notes
//!   adapters.
//!
//! # Invariants
//! - Every entry is identified by its `reference`.
//! - Entries are append-only; there is no update or delete model.

pub mod entry;
