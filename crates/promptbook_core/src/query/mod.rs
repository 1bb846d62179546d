//! Query/filter engine over record store sequences.
//!
//! # Responsibility
//! - Provide composable predicates and lazy filtering.
//! - Keep result ordering identical to store insertion order.

pub mod filter;

pub use filter::{filter, EntryQuery, Matching, Predicate};
