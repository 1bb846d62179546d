//! Tolerant line-oriented parser for the prompt notes document.
//!
//! # Responsibility
//! - Split a hand-authored markdown document into entry blocks.
//! - Seed each entry's verdict from the enclosing `##` section.
//! - Isolate failures per block so one malformed bullet never aborts the
//!   rest of the document.
//!
//! # Invariants
//! - Entries are returned in document order.
//! - A block is closed only by a heading, a new top-level bullet or
//!   unindented prose after a blank line; blank lines alone keep it open.
//! - Verdict comes from section placement only.

use crate::model::entry::{Entry, EntryValidationError, Verdict};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static MARKDOWN_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*<?((?:[^()\s<>]|\([^()\s<>]*\))+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("valid markdown link regex")
});
static AUTOLINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>\s]+)>").expect("valid autolink regex"));
static BARE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://[^\s<>()\[\]]+").expect("valid bare url regex")
});

const INDENT_THRESHOLD: usize = 2;
const TAB_WIDTH: usize = 4;
const NOTE_LABELS: &[&str] = &["note:", "notes:"];
const TAG_LABELS: &[&str] = &["tags:"];
/// Explicit prompt marker; lets prompt text start with another label.
pub(crate) const PROMPT_LABEL: &str = "prompt:";
const CODE_FENCE: &str = "```";
const URL_TRAILING_PUNCTUATION: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// Result of parsing one notes document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    /// Well-formed entries in document order.
    pub entries: Vec<Entry>,
    /// Skipped blocks in document order.
    pub errors: Vec<ParseError>,
}

/// One skipped block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line of the bullet that opened the block.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Bullet carries no link to use as reference.
    MissingReference,
    /// Block has a reference but no prompt text.
    MissingPrompt { reference: String },
    /// Bullet appears before any `##` section.
    OutsideSection,
    /// Section heading is neither good nor bad.
    UnclassifiedSection { heading: String },
    /// Assembled entry violates model invariants.
    InvalidEntry(EntryValidationError),
}

impl ParseErrorKind {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingReference => "missing_reference",
            Self::MissingPrompt { .. } => "missing_prompt",
            Self::OutsideSection => "outside_section",
            Self::UnclassifiedSection { .. } => "unclassified_section",
            Self::InvalidEntry(_) => "invalid_entry",
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            ParseErrorKind::MissingReference => write!(f, "bullet has no image link"),
            ParseErrorKind::MissingPrompt { reference } => {
                write!(f, "entry `{reference}` has no prompt text")
            }
            ParseErrorKind::OutsideSection => {
                write!(f, "bullet appears before any good/bad section")
            }
            ParseErrorKind::UnclassifiedSection { heading } => {
                write!(f, "section `{heading}` is neither good nor bad")
            }
            ParseErrorKind::InvalidEntry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ParseErrorKind::InvalidEntry(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    None,
    Classified(Verdict),
    Unclassified(String),
}

#[derive(Debug, Default)]
struct Block {
    line: usize,
    bullet: String,
    prompt: Vec<String>,
    notes: Vec<String>,
    tags: Vec<String>,
}

/// Meaning of one line of block content.
#[derive(Debug, PartialEq, Eq)]
enum Content<'a> {
    Skip,
    Prompt(&'a str),
    Note(&'a str),
    Tags(&'a str),
}

enum Line<'a> {
    Blank,
    Heading { level: usize, text: &'a str },
    Bullet(&'a str),
    Continuation(&'a str),
    Prose(&'a str),
}

/// Parses a notes document into entries plus per-block errors.
///
/// Never fails as a whole; malformed blocks are logged at `warn` and
/// reported in [`ParsedDocument::errors`].
pub fn import_document(text: &str) -> ParsedDocument {
    let mut document = ParsedDocument::default();
    let mut section = Section::None;
    let mut open: Option<Block> = None;
    let mut after_blank = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = classify_line(raw);
        let is_blank = matches!(line, Line::Blank);
        match line {
            Line::Blank => {}
            Line::Heading { level, text } => {
                close_block(&mut document, &section, open.take());
                match level {
                    1 if document.title.is_none() => document.title = Some(text.to_string()),
                    2 => section = classify_section(text),
                    _ => {}
                }
            }
            Line::Bullet(rest) => {
                close_block(&mut document, &section, open.take());
                open = Some(Block {
                    line: line_no,
                    bullet: rest.to_string(),
                    ..Block::default()
                });
            }
            Line::Continuation(content) => match open.as_mut() {
                Some(block) => push_continuation(block, content),
                None => debug!(
                    "event=notes_parse module=notes status=ignored line={line_no} reason=orphan_indent"
                ),
            },
            // Lazy continuation: unindented text glued to the block.
            Line::Prose(content) if !after_blank && open.is_some() => {
                if let Some(block) = open.as_mut() {
                    push_continuation(block, content);
                }
            }
            Line::Prose(_) => {
                close_block(&mut document, &section, open.take());
                debug!("event=notes_parse module=notes status=ignored line={line_no} reason=prose");
            }
        }
        after_blank = is_blank;
    }
    close_block(&mut document, &section, open.take());

    for error in &document.errors {
        warn!(
            "event=notes_parse module=notes status=skipped line={} error_code={}",
            error.line,
            error.kind.code()
        );
    }
    debug!(
        "event=notes_parse module=notes status=ok entries={} skipped={}",
        document.entries.len(),
        document.errors.len()
    );
    document
}

fn classify_line(raw: &str) -> Line<'_> {
    let line = raw.trim_end();
    let content = line.trim_start();
    if content.is_empty() {
        return Line::Blank;
    }
    if indent_width(line) >= INDENT_THRESHOLD {
        return Line::Continuation(content);
    }
    if let Some((level, text)) = parse_heading(content) {
        return Line::Heading { level, text };
    }
    if let Some(rest) = strip_bullet(content) {
        return Line::Bullet(rest);
    }
    Line::Prose(content)
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn parse_heading(content: &str) -> Option<(usize, &str)> {
    let level = content.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let rest = &content[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim_end()))
}

fn strip_bullet(content: &str) -> Option<&str> {
    let mut chars = content.chars();
    let marker = chars.next()?;
    if !matches!(marker, '-' | '*' | '+') {
        return None;
    }
    let rest = chars.as_str();
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn classify_section(heading: &str) -> Section {
    let first_word = heading
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match first_word.as_str() {
        "good" => Section::Classified(Verdict::Good),
        "bad" => Section::Classified(Verdict::Bad),
        _ => Section::Unclassified(heading.to_string()),
    }
}

fn classify_content(content: &str) -> Content<'_> {
    let content = strip_bullet(content).unwrap_or(content);
    if content.is_empty() || content.starts_with(CODE_FENCE) {
        return Content::Skip;
    }
    if let Some(prompt) = strip_label(content, &[PROMPT_LABEL]) {
        return Content::Prompt(prompt);
    }
    if let Some(note) = strip_label(content, NOTE_LABELS) {
        return Content::Note(note);
    }
    if let Some(tags) = strip_label(content, TAG_LABELS) {
        return Content::Tags(tags);
    }
    Content::Prompt(content)
}

/// Returns whether `line` would not read back as the same prompt text
/// without a `prompt:` marker.
pub(crate) fn needs_prompt_label(line: &str) -> bool {
    !matches!(classify_content(line), Content::Prompt(text) if text == line)
}

fn push_continuation(block: &mut Block, content: &str) {
    match classify_content(content) {
        Content::Skip => {}
        Content::Prompt(text) if !text.is_empty() => block.prompt.push(text.to_string()),
        Content::Note(note) if !note.is_empty() => block.notes.push(note.to_string()),
        Content::Tags(tags) => block.tags.extend(tags.split(',').map(str::to_string)),
        Content::Prompt(_) | Content::Note(_) => {}
    }
}

fn strip_label<'a>(content: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels.iter().find_map(|label| {
        let head = content.get(..label.len())?;
        head.eq_ignore_ascii_case(label)
            .then(|| content[label.len()..].trim())
    })
}

fn close_block(document: &mut ParsedDocument, section: &Section, block: Option<Block>) {
    let Some(block) = block else {
        return;
    };
    let line = block.line;
    match build_entry(section, block) {
        Ok(entry) => document.entries.push(entry),
        Err(kind) => document.errors.push(ParseError { line, kind }),
    }
}

fn build_entry(section: &Section, mut block: Block) -> Result<Entry, ParseErrorKind> {
    let verdict = match section {
        Section::None => return Err(ParseErrorKind::OutsideSection),
        Section::Unclassified(heading) => {
            return Err(ParseErrorKind::UnclassifiedSection {
                heading: heading.clone(),
            })
        }
        Section::Classified(verdict) => *verdict,
    };

    let (reference, rest) =
        find_reference(&block.bullet).ok_or(ParseErrorKind::MissingReference)?;

    // Text after the link on the bullet line comes first in its field.
    let lead = rest.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '-' | '.' | ',' | ';' | '\u{2013}' | '\u{2014}')
    });
    match classify_content(lead) {
        Content::Prompt(text) if !text.is_empty() => block.prompt.insert(0, text.to_string()),
        Content::Note(note) if !note.is_empty() => block.notes.insert(0, note.to_string()),
        Content::Tags(tags) => block.tags.extend(tags.split(',').map(str::to_string)),
        _ => {}
    }
    let prompt = block.prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err(ParseErrorKind::MissingPrompt { reference });
    }

    let entry = Entry::new(reference, prompt, verdict)
        .with_rationale(block.notes.join(" "))
        .with_tags(block.tags);
    entry.validate().map_err(ParseErrorKind::InvalidEntry)?;
    Ok(entry)
}

/// Finds the earliest link in `text`; returns its target and the text after it.
fn find_reference(text: &str) -> Option<(String, &str)> {
    [&*MARKDOWN_LINK_RE, &*AUTOLINK_RE, &*BARE_URL_RE]
        .into_iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            match caps.get(1) {
                Some(target) => Some((whole.start(), whole.end(), target.as_str())),
                // Bare URL: sentence punctuation is not part of the link.
                None => {
                    let target = whole.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION);
                    Some((whole.start(), whole.start() + target.len(), target))
                }
            }
        })
        .min_by_key(|(start, _, _)| *start)
        .map(|(_, end, target)| (target.to_string(), &text[end..]))
}
