//! Record store abstractions and implementations.
//!
//! # Responsibility
//! - Define the append-only entry store contract.
//! - Provide an in-memory store and a SQLite-backed persisted store.
//!
//! # Invariants
//! - Repository writes must enforce `Entry::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `DuplicateReference`) in addition to DB transport errors.

pub mod entry_repo;
pub mod memory_repo;
