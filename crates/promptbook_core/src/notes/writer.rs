//! Notes document writer.
//!
//! # Responsibility
//! - Serialize entries back into the two-section notes format.
//!
//! # Invariants
//! - Good section is written before Bad; both headings are always present.
//! - Within a section, entries keep their input order.
//! - Per-entry field order is reference, prompt, rationale, tags.
//! - Prompt lines that would read back as a label, bullet or fence are
//!   written behind an explicit `prompt:` marker.

use crate::model::entry::{Entry, Verdict};
use crate::notes::parser::{needs_prompt_label, PROMPT_LABEL};
use std::borrow::Borrow;
use std::fmt::Write as _;

/// Heading of the good-verdict section.
pub const GOOD_SECTION_HEADING: &str = "Good Images and prompts";
/// Heading of the bad-verdict section.
pub const BAD_SECTION_HEADING: &str = "Bad Images or characteristics";
/// Title used when callers do not provide one.
pub const DEFAULT_TITLE: &str = "Image prompt notes";

const INDENT: &str = "  ";
const LINK_LABEL: &str = "image";

/// Options for [`export_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Level-1 heading text. Omitted when blank.
    pub title: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Renders entries as a notes document.
pub fn export_document<I>(entries: I, options: &ExportOptions) -> String
where
    I: IntoIterator,
    I::Item: Borrow<Entry>,
{
    let (good, bad): (Vec<I::Item>, Vec<I::Item>) = entries
        .into_iter()
        .partition(|entry| entry.borrow().verdict == Verdict::Good);

    let mut out = String::new();
    let title = options.title.trim();
    if !title.is_empty() {
        let _ = writeln!(out, "# {title}\n");
    }
    write_section(&mut out, GOOD_SECTION_HEADING, &good);
    out.push('\n');
    write_section(&mut out, BAD_SECTION_HEADING, &bad);
    out
}

fn write_section<E: Borrow<Entry>>(out: &mut String, heading: &str, entries: &[E]) {
    let _ = writeln!(out, "## {heading}");
    for entry in entries {
        out.push('\n');
        write_entry(out, entry.borrow());
    }
}

fn write_entry(out: &mut String, entry: &Entry) {
    let _ = writeln!(out, "- {}", format_reference(&entry.reference));
    for line in entry.prompt.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if needs_prompt_label(line) {
            let _ = writeln!(out, "{INDENT}{PROMPT_LABEL} {line}");
        } else {
            let _ = writeln!(out, "{INDENT}{line}");
        }
    }
    if let Some(rationale) = entry.rationale.as_deref() {
        let _ = writeln!(out, "{INDENT}note: {}", single_line(rationale));
    }
    if !entry.tags.is_empty() {
        let tags = entry.tags.iter().map(String::as_str).collect::<Vec<_>>();
        let _ = writeln!(out, "{INDENT}tags: {}", tags.join(", "));
    }
}

fn format_reference(reference: &str) -> String {
    if reference.contains(['(', ')']) {
        format!("<{reference}>")
    } else {
        format!("[{LINK_LABEL}]({reference})")
    }
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
