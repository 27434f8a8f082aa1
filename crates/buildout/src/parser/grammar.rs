//! Recursive-descent grammar for buildout profiles.
//!
//! Each production pulls tokens on demand, choosing the scanner mode before
//! every pull. Productions that can fail return the diagnostic that stopped
//! them; the caller records it and resynchronises.

use super::ast::{
    AssignOp, OptionEntry, OptionValue, ReferenceSegment, Section, Segment, SyntaxNode,
    TextSegment, Trivia, TriviaKind, ValueKind,
};
use super::error::{Diagnostic, DiagnosticKind, Diagnostics};
use super::options::ParseOptions;
use super::scanner::{Baseline, Mode, Scanner, Token, TokenKind};
use super::span::Span;

/// Name given to the option written with the `=> parts` shorthand.
pub const PART_DEPENDENCIES: &str = "<part-dependencies>";

type Production<T> = Result<T, Diagnostic>;

/// What a grammar run produced, before it is assembled into a `Profile`.
pub(crate) struct Output {
    pub sections: Vec<Section>,
    pub trivia: Vec<Trivia>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Header {
    name_span: Span,
    condition_span: Option<Span>,
    span: Span,
}

pub(crate) struct Grammar<'a> {
    scanner: Scanner<'a>,
    options: &'a ParseOptions,
    diagnostics: Diagnostics,
    trivia: Vec<Trivia>,
}

impl<'a> Grammar<'a> {
    pub fn new(scanner: Scanner<'a>, options: &'a ParseOptions) -> Self {
        Self {
            scanner,
            options,
            diagnostics: Diagnostics::with_limit(options.max_diagnostics),
            trivia: Vec::new(),
        }
    }

    /// `Profile → (Comment | Section)*`
    pub fn profile(mut self) -> Output {
        let mut sections = Vec::new();
        loop {
            if self.scanner.at_line_start() && self.scanner.peek() == Some('[') {
                let start = self.scanner.mark().empty_span();
                match self.section() {
                    Ok(section) => sections.push(section),
                    Err(diagnostic) => self.recover(start, diagnostic),
                }
                continue;
            }
            let token = self.next(Mode::Default);
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Newline | TokenKind::Whitespace => {}
                TokenKind::Comment => self.comment(token.span),
                _ => self.recover(
                    token.span,
                    Diagnostic::new(DiagnosticKind::ExpectedSectionHeader, token.span),
                ),
            }
        }
        Output {
            sections,
            trivia: self.trivia,
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    /// `Section → SectionHeader Option*`
    fn section(&mut self) -> Production<Section> {
        let open = self.next(Mode::Default);
        let header = self.section_header(open)?;
        self.header_trailer();
        let options = self.section_body();
        let source = self.scanner.source();
        Ok(Section {
            name: name_text(header.name_span, source),
            name_span: header.name_span,
            condition: header
                .condition_span
                .map(|span| name_text(span, source)),
            condition_span: header.condition_span,
            header_span: header.span,
            options,
            span: self.span_from(open.span),
        })
    }

    /// `SectionHeader → '[' name (':' condition)? ']'`
    fn section_header(&mut self, open: Token) -> Production<Header> {
        let name_mode = Mode::SectionHeader { condition: false };
        let condition_mode = Mode::SectionHeader { condition: true };

        let token = self.next_skipping_space(name_mode);
        let name_span = match token.kind {
            TokenKind::SectionName => token.span,
            TokenKind::RightBracket | TokenKind::Colon => {
                return Err(Diagnostic::new(DiagnosticKind::EmptySectionName, token.span));
            }
            _ => {
                return Err(Diagnostic::new(DiagnosticKind::MissingCloseBracket, token.span));
            }
        };

        let mut token = self.next_skipping_space(name_mode);
        let mut condition_span = None;
        if token.kind == TokenKind::Colon {
            let colon = token.span;
            token = self.next_skipping_space(condition_mode);
            if token.kind == TokenKind::Condition {
                condition_span = Some(token.span);
                token = self.next_skipping_space(condition_mode);
            } else {
                condition_span = Some(Span::empty(colon.end, colon.line, colon.column + 1));
            }
        }

        if token.kind != TokenKind::RightBracket {
            return Err(Diagnostic::new(DiagnosticKind::MissingCloseBracket, token.span));
        }
        Ok(Header {
            name_span,
            condition_span,
            span: open.span.to(&token.span),
        })
    }

    /// Whitespace and an optional comment may follow `]` on the header line.
    fn header_trailer(&mut self) {
        loop {
            let token = self.next(Mode::Default);
            match token.kind {
                TokenKind::Whitespace => {}
                TokenKind::Comment => self.comment(token.span),
                TokenKind::Newline | TokenKind::Eof => return,
                _ => {
                    self.diagnostics
                        .push(DiagnosticKind::TrailingHeaderText, token.span);
                    if !self.scanner.at_line_start() {
                        self.scanner.skip_line();
                    }
                    self.skipped(token.span);
                    return;
                }
            }
        }
    }

    /// Options up to the next column-0 `[` or the end of input.
    ///
    /// Called at the start of a line, and every iteration leaves the scanner
    /// at the start of a line.
    fn section_body(&mut self) -> Vec<OptionEntry> {
        let mut options = Vec::new();
        loop {
            match self.scanner.peek() {
                None | Some('[') => break,
                Some('#' | ';') => {
                    let token = self.next(Mode::Default);
                    self.comment(token.span);
                }
                Some('\n') => {
                    self.next(Mode::Default);
                }
                Some('\r') if self.scanner.is_at("\r\n") => {
                    self.next(Mode::Default);
                }
                Some(' ' | '\t') => self.indented_line(),
                Some(_) => {
                    let start = self.scanner.mark().empty_span();
                    match self.option() {
                        Ok(option) => options.push(option),
                        Err(diagnostic) => self.skip_option(start, diagnostic),
                    }
                }
            }
        }
        options
    }

    /// An indented line that no option value claimed: blank, or an error.
    fn indented_line(&mut self) {
        let space = self.next(Mode::Default);
        match self.scanner.peek() {
            None | Some('\n') => {}
            Some('\r') if self.scanner.is_at("\r\n") => {}
            Some(_) => {
                let content = self.next(Mode::Default);
                self.skip_option(
                    space.span,
                    Diagnostic::new(DiagnosticKind::UnexpectedIndentation, content.span),
                );
            }
        }
    }

    /// `Option → name '=' OptionValue`
    fn option(&mut self) -> Production<OptionEntry> {
        let token = self.next(Mode::OptionName);
        let (name_span, operator, operator_span) = match token.kind {
            TokenKind::PartDependencies if self.options.part_dependencies => (
                Span::empty(token.span.start, token.span.line, token.span.column),
                AssignOp::Set,
                token.span,
            ),
            TokenKind::OptionName => {
                let assign = self.next_skipping_space(Mode::OptionName);
                let TokenKind::Assign(operator) = assign.kind else {
                    return Err(Diagnostic::new(DiagnosticKind::MissingAssignment, assign.span));
                };
                (token.span, operator, assign.span)
            }
            _ => return Err(Diagnostic::new(DiagnosticKind::EmptyOptionName, token.span)),
        };
        let name = if token.kind == TokenKind::PartDependencies {
            PART_DEPENDENCIES.to_string()
        } else {
            name_text(name_span, self.scanner.source())
        };

        let baseline = Baseline {
            option_indent: token.span.column - 1,
            block_indent: None,
        };
        let value = self.option_value(baseline);
        let end = value.span.end.max(operator_span.end);
        Ok(OptionEntry {
            name,
            name_span,
            operator,
            operator_span,
            value,
            span: Span::new(token.span.start, end, token.span.line, token.span.column),
        })
    }

    /// `OptionValue → (TextSegment | Reference)*`
    ///
    /// The first row is whatever follows the operator; further rows are taken
    /// while the scanner reports the next line as a continuation.
    fn option_value(&mut self, mut baseline: Baseline) -> OptionValue {
        if matches!(self.scanner.peek(), Some(' ' | '\t')) {
            self.next(Mode::Default);
        }
        let start = self.scanner.mark();
        let mut segments = Vec::new();
        self.value_row(&mut segments);
        let starts_on_option_line = !segments.is_empty();

        loop {
            let token = self.next(Mode::OptionValueMulti(baseline));
            match token.kind {
                TokenKind::Blank => {}
                TokenKind::Comment => self.comment(token.span),
                TokenKind::Indent => {
                    if baseline.block_indent.is_none() {
                        baseline.block_indent = Some(token.span.len());
                    }
                    self.value_row(&mut segments);
                }
                _ => break,
            }
        }

        let kind = if starts_on_option_line || segments.is_empty() {
            ValueKind::MonoLine
        } else {
            ValueKind::MultiLine
        };
        let span = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => first.span().to(&last.span()),
            _ => start.empty_span(),
        };
        OptionValue {
            kind,
            segments,
            span,
        }
    }

    /// Text and references up to and including the line ending.
    fn value_row(&mut self, segments: &mut Vec<Segment>) {
        loop {
            let token = self.next(Mode::OptionValueMono);
            match token.kind {
                TokenKind::Text | TokenKind::Invalid => {
                    push_text(segments, token.span, self.scanner.source());
                }
                TokenKind::ReferenceOpen => match self.reference(token.span) {
                    Ok(reference) => segments.push(Segment::Reference(reference)),
                    Err(diagnostic) => {
                        let span = diagnostic.span;
                        self.diagnostics.push_diagnostic(diagnostic);
                        push_text(segments, span, self.scanner.source());
                    }
                },
                _ => return,
            }
        }
    }

    /// `Reference → '${' (name ':')? name '}'`
    ///
    /// The scanner only opens a reference when a `}` follows on the same
    /// line, so this always ends on the closing brace.
    fn reference(&mut self, open: Span) -> Production<ReferenceSegment> {
        let head_mode = Mode::Reference { after_colon: false };
        let tail_mode = Mode::Reference { after_colon: true };

        let mut token = self.next_skipping_space(head_mode);
        let mut option_span = None;
        let mut section_span = None;
        if token.kind == TokenKind::ReferenceName {
            option_span = Some(token.span);
            token = self.next_skipping_space(head_mode);
        }
        if token.kind == TokenKind::Colon {
            section_span = option_span.take();
            token = self.next_skipping_space(tail_mode);
            if token.kind == TokenKind::ReferenceName {
                option_span = Some(token.span);
                token = self.next_skipping_space(tail_mode);
            }
        }

        let span = open.to(&token.span);
        let Some(option_span) = option_span else {
            return Err(Diagnostic::new(DiagnosticKind::EmptyReferenceOption, span));
        };
        let source = self.scanner.source();
        Ok(ReferenceSegment {
            section: section_span.map(|s| name_text(s, source)),
            section_span,
            option: name_text(option_span, source),
            option_span,
            span,
        })
    }

    fn next(&mut self, mode: Mode) -> Token {
        self.scanner.next_token(mode, &mut self.diagnostics)
    }

    fn next_skipping_space(&mut self, mode: Mode) -> Token {
        loop {
            let token = self.next(mode);
            if token.kind != TokenKind::Whitespace {
                return token;
            }
        }
    }

    fn comment(&mut self, span: Span) {
        self.trivia.push(Trivia {
            kind: TriviaKind::Comment,
            span,
        });
    }

    /// Records everything consumed since `from` as skipped input.
    fn skipped(&mut self, from: Span) {
        let span = self.span_from(from);
        if !span.is_empty() {
            self.trivia.push(Trivia {
                kind: TriviaKind::Skipped,
                span,
            });
        }
    }

    fn span_from(&self, from: Span) -> Span {
        Span::new(from.start, self.scanner.offset(), from.line, from.column)
    }

    /// Drops the rest of a malformed line along with any indented lines
    /// below it, then carries on with the section.
    fn skip_option(&mut self, from: Span, diagnostic: Diagnostic) {
        log::debug!("skipping malformed option line: {diagnostic}");
        self.diagnostics.push_diagnostic(diagnostic);
        if !self.scanner.at_line_start() {
            self.scanner.skip_line();
        }
        while matches!(self.scanner.peek(), Some(' ' | '\t')) {
            self.scanner.skip_line();
        }
        self.skipped(from);
    }

    /// Discards input up to the next column-0 `[` or the end of input.
    fn recover(&mut self, from: Span, diagnostic: Diagnostic) {
        log::debug!("resynchronising after: {diagnostic}");
        self.diagnostics.push_diagnostic(diagnostic);
        if !self.scanner.at_line_start() {
            self.scanner.skip_line();
        }
        while !self.scanner.at_eof() && self.scanner.peek() != Some('[') {
            self.scanner.skip_line();
        }
        self.skipped(from);
    }
}

/// The text of a name token without the control characters it embeds.
fn name_text(span: Span, source: &str) -> String {
    let name: String = span
        .text(source)
        .chars()
        .filter(|&c| c == '\t' || !c.is_control())
        .collect();
    name.trim_end_matches([' ', '\t']).to_string()
}

/// Appends literal text, merging with the previous segment when the two are
/// adjacent in the source.
fn push_text(segments: &mut Vec<Segment>, span: Span, source: &str) {
    if let Some(Segment::Text(previous)) = segments.last_mut()
        && previous.span.end == span.start
    {
        previous.text.push_str(span.text(source));
        previous.span.end = span.end;
        return;
    }
    segments.push(Segment::Text(TextSegment {
        text: span.text(source).to_string(),
        span,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ErrorClass, Parse, parse, parse_with};

    fn texts(value: &OptionValue) -> Vec<&str> {
        value
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.text.as_str(),
                Segment::Reference(reference) => reference.option.as_str(),
            })
            .collect()
    }

    fn only_option(parsed: &Parse) -> &OptionEntry {
        assert_eq!(parsed.profile.sections.len(), 1);
        assert_eq!(parsed.profile.sections[0].options.len(), 1);
        &parsed.profile.sections[0].options[0]
    }

    #[test]
    fn empty_condition_is_kept() {
        let parsed = parse("[a:]\n");
        let section = &parsed.profile.sections[0];
        assert_eq!(section.condition.as_deref(), Some(""));
        assert_eq!(section.condition_span.map(|s| s.start), Some(3));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn multi_line_rows_are_dedented() {
        let parsed = parse("[a]\nk =\n    deep\n  shallow\n");
        let option = only_option(&parsed);
        assert_eq!(option.value.kind, ValueKind::MultiLine);
        assert_eq!(texts(&option.value), vec!["deep", "shallow"]);

        let parsed = parse("[a]\nk =\n  a\n    b\n");
        assert_eq!(texts(&only_option(&parsed).value), vec!["a", "  b"]);
    }

    #[test]
    fn indented_lines_continue_a_mono_line_value() {
        let parsed = parse("[a]\nk = one\n  two\nnext = 3\n");
        let section = &parsed.profile.sections[0];
        assert_eq!(section.options.len(), 2);
        assert_eq!(section.options[0].value.kind, ValueKind::MonoLine);
        assert_eq!(section.options[0].value.rows().len(), 2);
        assert_eq!(texts(&section.options[1].value), vec!["3"]);
    }

    #[test]
    fn column_zero_comment_inside_a_value_is_trivia() {
        let text = "[a]\nk =\n  one\n# note\n  two\n";
        let parsed = parse(text);
        let option = only_option(&parsed);
        assert_eq!(texts(&option.value), vec!["one", "two"]);
        assert_eq!(parsed.profile.trivia.len(), 1);
        assert_eq!(parsed.profile.trivia[0].span.text(text), "# note");
    }

    #[test]
    fn trailing_blank_lines_are_outside_the_value_span() {
        let text = "[a]\nk =\n  one\n\n  \n[b]\n";
        let parsed = parse(text);
        let option = &parsed.profile.sections[0].options[0];
        assert_eq!(option.value.span.text(text), "one");
        assert_eq!(option.span.text(text), "k =\n  one");
        assert_eq!(parsed.profile.sections[1].name, "b");
    }

    #[test]
    fn assignment_operators() {
        let parsed = parse("[a]\neggs += spam\nparts-=x\n");
        let options = &parsed.profile.sections[0].options;
        assert_eq!(options[0].name, "eggs");
        assert_eq!(options[0].operator, AssignOp::Append);
        assert_eq!(options[1].name, "parts");
        assert_eq!(options[1].operator, AssignOp::Remove);
        assert_eq!(texts(&options[1].value), vec!["x"]);
    }

    #[test]
    fn part_dependencies_shorthand() {
        let parsed = parse("[a]\n=> b c\n");
        let option = only_option(&parsed);
        assert_eq!(option.name, PART_DEPENDENCIES);
        assert!(option.name_span.is_empty());
        assert_eq!(texts(&option.value), vec!["b c"]);
    }

    #[test]
    fn part_dependencies_can_be_disabled() {
        let options = ParseOptions::builder().part_dependencies(false).build();
        let parsed = parse_with("[a]\n=> b c\n", &options);
        assert!(parsed.profile.sections[0].options.is_empty());
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::EmptyOptionName);
    }

    #[test]
    fn malformed_reference_becomes_text() {
        let parsed = parse("[a]\nk = x${}y ${a:}\n");
        let option = only_option(&parsed);
        assert_eq!(texts(&option.value), vec!["x${}y ${a:}"]);
        let kinds: Vec<_> = parsed.diagnostics.iter().map(|d| &d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &DiagnosticKind::EmptyReferenceOption,
                &DiagnosticKind::EmptyReferenceOption
            ]
        );
    }

    #[test]
    fn unterminated_reference_is_lexical() {
        let parsed = parse("[a]\nk = see ${b\n");
        let option = only_option(&parsed);
        assert_eq!(texts(&option.value), vec!["see ${b"]);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].class(), ErrorClass::Lexical);
    }

    #[test]
    fn reference_names_are_trimmed() {
        let parsed = parse("[a]\nk = ${ b : c }\n");
        let option = only_option(&parsed);
        let reference = option.value.references().next().unwrap();
        assert_eq!(reference.section.as_deref(), Some("b"));
        assert_eq!(reference.option, "c");
        assert_eq!(reference.to_string(), "${b:c}");
    }

    #[test]
    fn trailing_header_text_keeps_the_section() {
        let text = "[a] junk\nk = v\n";
        let parsed = parse(text);
        assert_eq!(parsed.profile.sections[0].options.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].kind,
            DiagnosticKind::TrailingHeaderText
        );
        assert_eq!(parsed.profile.trivia[0].kind, TriviaKind::Skipped);
        assert_eq!(parsed.profile.trivia[0].span.text(text), "junk\n");
    }

    #[test]
    fn header_comment_is_trivia() {
        let parsed = parse("[a] # the main part\n");
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.profile.comments().count(), 1);
    }

    #[test]
    fn missing_assignment_skips_one_line() {
        let text = "[a]\nbroken\n  more\nk = v\n";
        let parsed = parse(text);
        let option = only_option(&parsed);
        assert_eq!(option.name, "k");
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::MissingAssignment);
        assert_eq!(parsed.profile.trivia[0].span.text(text), "broken\n  more\n");
    }

    #[test]
    fn stray_indentation_is_reported() {
        let parsed = parse("[a]\n  stray\nk = v\n");
        assert_eq!(only_option(&parsed).name, "k");
        assert_eq!(
            parsed.diagnostics[0].kind,
            DiagnosticKind::UnexpectedIndentation
        );
    }

    #[test]
    fn text_before_the_first_section_is_skipped() {
        let text = "orphan = 1\n[a]\n";
        let parsed = parse(text);
        assert_eq!(parsed.profile.sections[0].name, "a");
        assert_eq!(
            parsed.diagnostics[0].kind,
            DiagnosticKind::ExpectedSectionHeader
        );
        assert_eq!(parsed.profile.trivia[0].span.text(text), "orphan = 1\n");
    }

    #[test]
    fn empty_section_name() {
        let parsed = parse("[]\n[b]\n");
        assert_eq!(parsed.profile.sections.len(), 1);
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::EmptySectionName);
    }
}
