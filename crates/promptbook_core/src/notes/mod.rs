//! Import/export adapter for the prompt notes document.
//!
//! # Responsibility
//! - Parse the hand-authored two-section markdown format into entries.
//! - Write entries back into the same format.
//!
//! # Document shape
//! - `# Title`
//! - `## Good Images and prompts` / `## Bad Images or characteristics`
//! - `- [image](reference)` bullets, followed by indented prompt lines and
//!   optional `note:` and `tags:` lines.

pub mod parser;
pub mod writer;

pub use parser::{import_document, ParseError, ParseErrorKind, ParsedDocument};
pub use writer::{
    export_document, ExportOptions, BAD_SECTION_HEADING, DEFAULT_TITLE, GOOD_SECTION_HEADING,
};
