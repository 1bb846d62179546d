use promptbook_core::{
    export_document, import_document, Entry, ExportOptions, ParseErrorKind, Verdict,
};

const SAMPLE_DOCUMENT: &str = "\
# Image prompt notes

## Good Images and prompts

- [image](https://img.example/fox.png)
  a red fox curled up in fresh snow, golden hour
  note: fur detail holds up at full size
  tags: animals, winter

- <https://img.example/portrait_(v2).png>
  studio portrait, soft key light
  from the left side
  Note: skin tones look natural

## Bad Images or characteristics

- [image](https://img.example/city.png) - neon city street at night
  note: windows melt into each other

- this bullet forgot its link
  a lighthouse on a cliff

- https://img.example/lake.png
  mirror-still lake with reflections
";

#[test]
fn sample_document_imports_with_sections_and_skips() {
    let parsed = import_document(SAMPLE_DOCUMENT);

    assert_eq!(parsed.title.as_deref(), Some("Image prompt notes"));
    assert_eq!(parsed.entries.len(), 4);
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].line, 20);
    assert_eq!(parsed.errors[0].kind, ParseErrorKind::MissingReference);

    let fox = &parsed.entries[0];
    assert_eq!(fox.reference, "https://img.example/fox.png");
    assert_eq!(
        fox.prompt,
        "a red fox curled up in fresh snow, golden hour"
    );
    assert_eq!(fox.verdict, Verdict::Good);
    assert_eq!(
        fox.rationale.as_deref(),
        Some("fur detail holds up at full size")
    );
    assert!(fox.has_tag("animals") && fox.has_tag("winter"));

    let portrait = &parsed.entries[1];
    assert_eq!(portrait.reference, "https://img.example/portrait_(v2).png");
    assert_eq!(
        portrait.prompt,
        "studio portrait, soft key light from the left side"
    );
    assert_eq!(portrait.rationale.as_deref(), Some("skin tones look natural"));

    let city = &parsed.entries[2];
    assert_eq!(city.verdict, Verdict::Bad);
    assert_eq!(city.prompt, "neon city street at night");

    let lake = &parsed.entries[3];
    assert_eq!(lake.verdict, Verdict::Bad);
    assert_eq!(lake.rationale, None);
}

#[test]
fn single_good_entry_with_note() {
    let parsed = import_document(
        "## Good Images and prompts\n- [R1](https://r1.example)\n  P1\n  note: good\n",
    );

    assert!(parsed.errors.is_empty());
    assert_eq!(
        parsed.entries,
        vec![Entry::new("https://r1.example", "P1", Verdict::Good).with_rationale("good")]
    );
}

#[test]
fn bad_entry_without_note_has_no_rationale() {
    let parsed =
        import_document("## Bad Images or characteristics\n- [x](https://r2.example)\n  P2\n");

    assert!(parsed.errors.is_empty());
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].verdict, Verdict::Bad);
    assert_eq!(parsed.entries[0].rationale, None);
}

#[test]
fn malformed_blocks_are_isolated() {
    let parsed = import_document(
        "\
- [early](https://r0.example)
  before any section

## Good Images and prompts
- no link at all
  still a prompt
- [ok](https://r1.example)
  fine prompt
- [empty](https://r2.example)

## Ideas
- [idea](https://r3.example)
  not judged yet

## Bad Images or characteristics
- [ok](https://r4.example)
  also fine
",
    );

    let references: Vec<&str> = parsed
        .entries
        .iter()
        .map(|entry| entry.reference.as_str())
        .collect();
    assert_eq!(references, vec!["https://r1.example", "https://r4.example"]);

    let kinds: Vec<&str> = parsed.errors.iter().map(|error| error.kind.code()).collect();
    assert_eq!(
        kinds,
        vec![
            "outside_section",
            "missing_reference",
            "missing_prompt",
            "unclassified_section"
        ]
    );
    assert_eq!(parsed.errors[2].line, 9);
}

#[test]
fn verdict_follows_section_boundaries_exactly() {
    let parsed = import_document(
        "\
## Bad Images or characteristics
- [a](https://a.example)
  first bad
## Good Images and prompts
- [b](https://b.example)
  now good
## Bad again
- [c](https://c.example)
  bad once more
",
    );

    let verdicts: Vec<Verdict> = parsed.entries.iter().map(|entry| entry.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Bad, Verdict::Good, Verdict::Bad]);
}

#[test]
fn lazy_continuation_and_prose_after_blank_line() {
    let parsed = import_document(
        "\
## Good Images and prompts
- [a](https://a.example)
glued prompt line

Loose commentary that belongs to nobody.
  indented text after prose is orphaned
",
    );

    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].prompt, "glued prompt line");
    assert!(parsed.errors.is_empty());
}

#[test]
fn blank_lines_inside_a_block_keep_it_open() {
    let parsed = import_document(
        "\
## Good Images and prompts
- [a](https://a.example)

  prompt after a blank line

  note: still the same entry
",
    );

    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].prompt, "prompt after a blank line");
    assert_eq!(
        parsed.entries[0].rationale.as_deref(),
        Some("still the same entry")
    );
}

#[test]
fn export_then_import_preserves_semantic_content() {
    let parsed = import_document(SAMPLE_DOCUMENT);
    let exported = export_document(&parsed.entries, &ExportOptions::default());
    let reparsed = import_document(&exported);

    assert!(reparsed.errors.is_empty());
    assert_eq!(reparsed.title.as_deref(), Some("Image prompt notes"));

    let mut original = parsed.entries.clone();
    let mut roundtrip = reparsed.entries.clone();
    original.sort_by(|a, b| a.reference.cmp(&b.reference));
    roundtrip.sort_by(|a, b| a.reference.cmp(&b.reference));
    assert_eq!(roundtrip, original);
}

#[test]
fn export_groups_good_before_bad() {
    let entries = vec![
        Entry::new("https://b.example", "bad one", Verdict::Bad),
        Entry::new("https://g.example", "good one", Verdict::Good),
    ];
    let text = export_document(&entries, &ExportOptions::default());

    let good_heading = text.find("## Good Images and prompts").unwrap();
    let bad_heading = text.find("## Bad Images or characteristics").unwrap();
    let good_entry = text.find("https://g.example").unwrap();
    let bad_entry = text.find("https://b.example").unwrap();
    assert!(good_heading < good_entry);
    assert!(good_entry < bad_heading);
    assert!(bad_heading < bad_entry);
}

#[test]
fn label_on_bullet_line_is_classified_like_continuations() {
    let parsed = import_document(
        "\
## Good Images and prompts
- [img](https://a.example/1.png) note: loved the light
  a cat on a roof
- [img](https://a.example/2.png) tags: Cats, roofs
  a cat on a fence
",
    );

    assert!(parsed.errors.is_empty());
    assert_eq!(parsed.entries[0].prompt, "a cat on a roof");
    assert_eq!(parsed.entries[0].rationale.as_deref(), Some("loved the light"));
    assert_eq!(parsed.entries[1].prompt, "a cat on a fence");
    assert!(parsed.entries[1].has_tag("cats") && parsed.entries[1].has_tag("roofs"));

    let exported = export_document(&parsed.entries, &ExportOptions::default());
    assert_eq!(import_document(&exported).entries, parsed.entries);
}

#[test]
fn prompts_that_look_like_labels_survive_export() {
    let entries = vec![
        Entry::new("https://a.example/1.png", "note: not a rationale", Verdict::Good),
        Entry::new("https://a.example/2.png", "tags: literally", Verdict::Good),
        Entry::new("https://a.example/3.png", "- leading dash", Verdict::Bad)
            .with_rationale("kept apart"),
        Entry::new("https://a.example/4.png", "```", Verdict::Bad),
        Entry::new("https://a.example/5.png", "prompt: nested marker", Verdict::Bad),
    ];

    let exported = export_document(&entries, &ExportOptions::default());
    let reparsed = import_document(&exported);

    assert!(reparsed.errors.is_empty(), "{:?}", reparsed.errors);
    assert_eq!(reparsed.entries, entries);
}

#[test]
fn link_with_balanced_parentheses_keeps_full_reference() {
    let parsed = import_document(
        "## Good Images and prompts\n- [img](https://en.wikipedia.org/wiki/Cat_(animal)) a cat\n",
    );

    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(
        parsed.entries[0].reference,
        "https://en.wikipedia.org/wiki/Cat_(animal)"
    );
    assert_eq!(parsed.entries[0].prompt, "a cat");

    let exported = export_document(&parsed.entries, &ExportOptions::default());
    assert_eq!(import_document(&exported).entries, parsed.entries);
}

#[test]
fn bare_url_at_sentence_end_drops_punctuation() {
    let parsed = import_document(
        "## Bad Images or characteristics\n- https://x.example/a.png. A fox in snow\n",
    );

    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].reference, "https://x.example/a.png");
    assert_eq!(parsed.entries[0].prompt, "A fox in snow");
}
