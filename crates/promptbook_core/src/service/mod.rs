//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, notes adapter and query engine into use-case
//!   level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod entry_service;
pub mod tagging;
