//! Syntax tree for buildout profiles.
//!
//! The tree is plain owned data. Every node records the [`Span`] of source
//! text it was built from, which is what editor tooling keys on.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use super::span::{Shift, Span};

/// Discriminant for every kind of node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Profile,
    Section,
    Option,
    OptionValue,
    Text,
    Reference,
    Comment,
    Skipped,
}

/// Accessors shared by all nodes.
pub trait SyntaxNode {
    fn kind(&self) -> NodeKind;

    fn span(&self) -> Span;

    /// The source text of this node.
    fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span().text(source)
    }
}

/// A parsed profile: sections in source order plus the trivia between them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Profile {
    pub sections: Vec<Section>,
    /// Comments and skipped malformed input, in source order.
    pub trivia: Vec<Trivia>,
    pub span: Span,
}

impl Profile {
    /// All sections with the given name, in source order.
    ///
    /// Later sections extend or override earlier ones; merging them is left
    /// to the caller.
    pub fn sections_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections.iter().filter(move |s| s.name == name)
    }

    /// Every reference in the profile together with where it appears.
    pub fn references(&self) -> impl Iterator<Item = ReferenceSite<'_>> {
        self.sections.iter().flat_map(|section| {
            section.options.iter().flat_map(move |option| {
                option
                    .value
                    .references()
                    .map(move |reference| ReferenceSite {
                        section,
                        option,
                        reference,
                    })
            })
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &Trivia> {
        self.trivia
            .iter()
            .filter(|t| t.kind == TriviaKind::Comment)
    }
}

impl SyntaxNode for Profile {
    fn kind(&self) -> NodeKind {
        NodeKind::Profile
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// A `[name]` or `[name:condition]` section and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub name_span: Span,
    /// Present only when the header contains a `:`; may be empty.
    pub condition: Option<String>,
    pub condition_span: Option<Span>,
    /// From `[` through `]`.
    pub header_span: Span,
    pub options: Vec<OptionEntry>,
    /// From `[` up to the next section or the end of input.
    pub span: Span,
}

impl Section {
    /// The effective definition of an option: the last one with this name.
    pub fn option(&self, name: &str) -> Option<&OptionEntry> {
        self.options.iter().rev().find(|o| o.name == name)
    }

    pub(crate) fn shift(&mut self, by: Shift) {
        self.name_span.shift(by);
        if let Some(span) = &mut self.condition_span {
            span.shift(by);
        }
        self.header_span.shift(by);
        for option in &mut self.options {
            option.shift(by);
        }
        self.span.shift(by);
    }
}

impl SyntaxNode for Section {
    fn kind(&self) -> NodeKind {
        NodeKind::Section
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// How an option line combines with earlier definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssignOp {
    /// `name = value`
    Set,
    /// `name += value`
    Append,
    /// `name -= value`
    Remove,
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssignOp::Set => "=".fmt(f),
            AssignOp::Append => "+=".fmt(f),
            AssignOp::Remove => "-=".fmt(f),
        }
    }
}

/// A `name = value` option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub name: String,
    pub name_span: Span,
    pub operator: AssignOp,
    pub operator_span: Span,
    pub value: OptionValue,
    /// From the name through the last character of the value.
    pub span: Span,
}

impl OptionEntry {
    pub(crate) fn shift(&mut self, by: Shift) {
        self.name_span.shift(by);
        self.operator_span.shift(by);
        self.value.shift(by);
        self.span.shift(by);
    }
}

impl SyntaxNode for OptionEntry {
    fn kind(&self) -> NodeKind {
        NodeKind::Option
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// Where an option value starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    /// The value starts on the `name =` line.
    MonoLine,
    /// Nothing follows `=`; the value is on the indented lines below.
    MultiLine,
}

/// The value of an option, as text and reference segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionValue {
    pub kind: ValueKind,
    pub segments: Vec<Segment>,
    pub span: Span,
}

impl OptionValue {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments grouped by the source line they were written on.
    pub fn rows(&self) -> Vec<&[Segment]> {
        self.segments
            .chunk_by(|a, b| a.span().line == b.span().line)
            .collect()
    }

    pub fn references(&self) -> impl Iterator<Item = &ReferenceSegment> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Reference(reference) => Some(reference),
            Segment::Text(_) => None,
        })
    }

    pub(crate) fn shift(&mut self, by: Shift) {
        for segment in &mut self.segments {
            segment.shift(by);
        }
        self.span.shift(by);
    }
}

impl SyntaxNode for OptionValue {
    fn kind(&self) -> NodeKind {
        NodeKind::OptionValue
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// A piece of an option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    Text(TextSegment),
    Reference(ReferenceSegment),
}

impl Segment {
    fn shift(&mut self, by: Shift) {
        match self {
            Segment::Text(text) => text.span.shift(by),
            Segment::Reference(reference) => reference.shift(by),
        }
    }
}

impl SyntaxNode for Segment {
    fn kind(&self) -> NodeKind {
        match self {
            Segment::Text(_) => NodeKind::Text,
            Segment::Reference(_) => NodeKind::Reference,
        }
    }

    fn span(&self) -> Span {
        match self {
            Segment::Text(text) => text.span,
            Segment::Reference(reference) => reference.span,
        }
    }
}

/// Literal value text, verbatim from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub text: String,
    pub span: Span,
}

/// A `${section:option}` or `${:option}` reference. Never resolved here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSegment {
    /// `None` means the section containing the reference.
    pub section: Option<String>,
    pub section_span: Option<Span>,
    pub option: String,
    pub option_span: Span,
    /// From `${` through `}`.
    pub span: Span,
}

impl ReferenceSegment {
    fn shift(&mut self, by: Shift) {
        if let Some(span) = &mut self.section_span {
            span.shift(by);
        }
        self.option_span.shift(by);
        self.span.shift(by);
    }
}

impl Display for ReferenceSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "${{{}:{}}}",
            self.section.as_deref().unwrap_or_default(),
            self.option
        )
    }
}

/// A reference and the option it was written in.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSite<'a> {
    pub section: &'a Section,
    pub option: &'a OptionEntry,
    pub reference: &'a ReferenceSegment,
}

impl<'a> ReferenceSite<'a> {
    /// The section name the reference points at, with `${:option}` read as
    /// the enclosing section.
    pub fn target_section(&self) -> &'a str {
        self.reference
            .section
            .as_deref()
            .unwrap_or(&self.section.name)
    }
}

/// Non-semantic source text kept for round-tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
}

impl Trivia {
    pub(crate) fn shift(&mut self, by: Shift) {
        self.span.shift(by);
    }
}

impl SyntaxNode for Trivia {
    fn kind(&self) -> NodeKind {
        match self.kind {
            TriviaKind::Comment => NodeKind::Comment,
            TriviaKind::Skipped => NodeKind::Skipped,
        }
    }

    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriviaKind {
    /// A `#` or `;` comment, or a run of consecutive comment lines.
    Comment,
    /// Malformed input skipped during error recovery.
    Skipped,
}
