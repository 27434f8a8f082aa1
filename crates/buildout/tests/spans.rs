//! Integration tests for node spans and lossless round-tripping

use buildout::parser::{NodeKind, Profile, Span, SyntaxNode, parse};
use pretty_assertions::assert_eq;

const PROFILE: &str = "\
# Buildout for the app
[buildout]
extends = base.cfg
parts =
    app
    tests
; pinned below
[versions:python3]  # conditional
zc.buildout = 3.0
=> app

[app]
recipe = zc.recipe.egg
eggs += ${buildout:eggs} ${:extra}
# trailing note
";

/// Asserts that `children` are ordered, lie inside `parent`, and that only
/// whitespace sits between them.
fn assert_tiles(text: &str, parent: Span, mut children: Vec<Span>) {
    children.sort_by_key(|s| (s.start, s.end));
    let mut cursor = parent.start;
    for child in children {
        assert!(
            parent.contains(&child),
            "{child:?} is outside {parent:?} in {:?}",
            parent.text(text)
        );
        assert!(child.start >= cursor, "{child:?} overlaps an earlier node");
        let gap = &text[cursor..child.start];
        assert!(
            gap.chars().all(char::is_whitespace),
            "unexpected text {gap:?} between nodes"
        );
        cursor = child.end;
    }
    let gap = &text[cursor..parent.end];
    assert!(gap.chars().all(char::is_whitespace), "unexpected trailing text {gap:?}");
}

fn trivia_within(profile: &Profile, span: Span) -> Vec<Span> {
    profile
        .trivia
        .iter()
        .map(SyntaxNode::span)
        .filter(|t| span.contains(t))
        .collect()
}

#[test]
fn test_every_node_is_covered_by_its_children() {
    let parsed = parse(PROFILE);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    let profile = &parsed.profile;

    let mut top: Vec<Span> = profile.sections.iter().map(SyntaxNode::span).collect();
    top.extend(
        profile
            .trivia
            .iter()
            .map(SyntaxNode::span)
            .filter(|t| !profile.sections.iter().any(|s| s.span.contains(t))),
    );
    assert_tiles(PROFILE, profile.span, top);

    for section in &profile.sections {
        let mut children = vec![section.header_span];
        children.extend(section.options.iter().map(SyntaxNode::span));
        children.extend(
            trivia_within(profile, section.span)
                .into_iter()
                .filter(|t| !section.options.iter().any(|o| o.span.contains(t))),
        );
        assert_tiles(PROFILE, section.span, children);

        for option in &section.options {
            assert_tiles(
                PROFILE,
                option.span,
                vec![option.name_span, option.operator_span, option.value.span],
            );
            let mut rows: Vec<Span> = option.value.segments.iter().map(SyntaxNode::span).collect();
            rows.extend(trivia_within(profile, option.value.span));
            assert_tiles(PROFILE, option.value.span, rows);
        }
    }
}

#[test]
fn test_sibling_sections_are_contiguous() {
    let parsed = parse(PROFILE);
    let sections = &parsed.profile.sections;
    for pair in sections.windows(2) {
        assert_eq!(pair[0].span.end, pair[1].span.start);
    }
    assert_eq!(sections.last().map(|s| s.span.end), Some(PROFILE.len()));
}

#[test]
fn test_spans_slice_the_expected_text() {
    let parsed = parse(PROFILE);
    let versions = &parsed.profile.sections[1];
    assert_eq!(versions.header_span.text(PROFILE), "[versions:python3]");
    assert_eq!(versions.name_span.text(PROFILE), "versions");
    assert_eq!(
        versions.condition_span.map(|s| s.text(PROFILE)),
        Some("python3")
    );

    let eggs = parsed.profile.sections[2].option("eggs").expect("eggs");
    assert_eq!(eggs.operator_span.text(PROFILE), "+=");
    assert_eq!(
        eggs.value.text(PROFILE),
        "${buildout:eggs} ${:extra}"
    );
    let references: Vec<_> = eggs.value.references().collect();
    assert_eq!(
        references[0].section_span.map(|s| s.text(PROFILE)),
        Some("buildout")
    );
    assert_eq!(references[1].option_span.text(PROFILE), "extra");
    assert_eq!(references[1].section_span, None);
}

#[test]
fn test_lines_and_columns() {
    let parsed = parse(PROFILE);
    let parts = parsed.profile.sections[0].option("parts").expect("parts");
    let rows = parts.value.rows();
    assert_eq!(rows.len(), 2);
    let tests = rows[1][0].span();
    assert_eq!((tests.line, tests.column), (6, 5));

    let eggs = parsed.profile.sections[2].option("eggs").expect("eggs");
    let extra = eggs.value.segments.last().expect("segment").span();
    assert_eq!((extra.line, extra.column), (14, 26));
}

#[test]
fn test_columns_count_characters() {
    let text = "[a]\nnamé = ${x}\n";
    let parsed = parse(text);
    let reference = parsed.profile.sections[0].options[0].value.segments[0].span();
    assert_eq!(reference.column, 8);
    assert_eq!(reference.text(text), "${x}");
}

#[test]
fn test_node_kinds() {
    let parsed = parse(PROFILE);
    let profile = &parsed.profile;
    assert_eq!(profile.kind(), NodeKind::Profile);
    assert_eq!(profile.sections[0].kind(), NodeKind::Section);
    let eggs = profile.sections[2].option("eggs").expect("eggs");
    assert_eq!(eggs.kind(), NodeKind::Option);
    assert_eq!(eggs.value.kind(), NodeKind::OptionValue);
    let segment_kinds: Vec<_> = eggs.value.segments.iter().map(SyntaxNode::kind).collect();
    assert_eq!(
        segment_kinds,
        vec![NodeKind::Reference, NodeKind::Text, NodeKind::Reference]
    );
    assert!(profile.trivia.iter().all(|t| t.kind() == NodeKind::Comment));
}
