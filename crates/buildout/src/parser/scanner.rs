//! Mode-driven scanner for buildout profiles.
//!
//! The scanner never decides on its own how to read the next token: the
//! grammar passes a [`Mode`] to every [`Scanner::next_token`] call. The only
//! state kept between calls is the cursor and the current line.

use winnow::combinator::{alt, not, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use super::ast::AssignOp;
use super::error::{DiagnosticKind, Diagnostics};
use super::span::Span;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Lexical mode selected by the grammar before each token pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Between sections and options: `[`, comments, blank lines.
    Default,
    /// After `[`. With `condition` set, after the `:` of a header.
    SectionHeader { condition: bool },
    /// Start of an option line: the name and its assignment operator.
    OptionName,
    /// Value text up to the end of the current line.
    OptionValueMono,
    /// Start of a line that may continue a value.
    OptionValueMulti(Baseline),
    /// Inside `${...}`. With `after_colon` set, the option part.
    Reference { after_colon: bool },
}

/// Indentation recorded for the option whose value is being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Baseline {
    /// Indentation of the line holding the option name.
    pub option_indent: usize,
    /// Indentation of the first continuation row, once one was seen.
    pub block_indent: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftBracket,
    RightBracket,
    Colon,
    SectionName,
    Condition,
    OptionName,
    Assign(AssignOp),
    /// `=>` at the start of an option line.
    PartDependencies,
    Text,
    ReferenceOpen,
    ReferenceName,
    ReferenceClose,
    /// A comment, or a collapsed run of comment lines.
    Comment,
    Whitespace,
    /// Continuation indentation stripped from a value row.
    Indent,
    /// A whitespace-only line inside a value, including its line ending.
    Blank,
    Newline,
    /// Input that does not belong in the current mode.
    Unexpected,
    /// `${` with no closing `}` on the same line.
    Invalid,
    /// Zero-width: the next line does not continue the value.
    EndOfValue,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// A saved scanner position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Mark {
    pub fn span_to(&self, end: usize) -> Span {
        Span::new(self.offset, end, self.line, self.column)
    }

    pub fn empty_span(&self) -> Span {
        Span::empty(self.offset, self.line, self.column)
    }
}

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
    collapse_comments: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, collapse_comments: bool) -> Self {
        let mut scanner = Self::starting_at(text, 0, 1, collapse_comments);
        if text.starts_with(BYTE_ORDER_MARK) {
            scanner.pos = BYTE_ORDER_MARK.len_utf8();
            scanner.line_start = scanner.pos;
        }
        scanner
    }

    /// Resumes scanning at `offset`, which must be the first byte of `line`.
    pub fn starting_at(text: &'a str, offset: usize, line: usize, collapse_comments: bool) -> Self {
        Self {
            text,
            pos: offset,
            line,
            line_start: offset,
            collapse_comments,
        }
    }

    pub fn source(&self) -> &'a str {
        self.text
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn is_at(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn at_line_start(&self) -> bool {
        self.pos == self.line_start
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn mark(&self) -> Mark {
        Mark {
            offset: self.pos,
            line: self.line,
            column: self.text[self.line_start..self.pos].chars().count() + 1,
        }
    }

    /// Scans one token using the rules of `mode`.
    ///
    /// Stray control characters in front of the token are skipped, each with
    /// a lexical diagnostic.
    pub fn next_token(&mut self, mode: Mode, diagnostics: &mut Diagnostics) -> Token {
        self.skip_control_characters(diagnostics);
        let start = self.mark();
        let kind = match mode {
            Mode::Default => self.scan_default(),
            Mode::SectionHeader { condition } => self.scan_header(condition),
            Mode::OptionName => self.scan_option_name(),
            Mode::OptionValueMono => self.scan_value(),
            Mode::OptionValueMulti(baseline) => self.scan_continuation(baseline),
            Mode::Reference { after_colon } => self.scan_reference(after_colon),
        };
        let span = start.span_to(self.pos);
        match kind {
            TokenKind::Invalid => {
                log::trace!("invalid token in {mode:?} at {}:{}", span.line, span.column);
                diagnostics.push(DiagnosticKind::UnterminatedReference, span);
            }
            TokenKind::SectionName
            | TokenKind::Condition
            | TokenKind::OptionName
            | TokenKind::ReferenceName => self.report_embedded_controls(start, span, diagnostics),
            _ => {}
        }
        Token { kind, span }
    }

    /// Consumes the rest of the current line, including its line ending,
    /// without interpreting it. Returns false at end of input.
    pub fn skip_line(&mut self) -> bool {
        let before = self.pos;
        self.eat(raw_line);
        self.eat(line_ending);
        self.pos > before
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.text[self.pos..self.pos + len];
        for (index, _) in consumed.match_indices('\n') {
            self.line += 1;
            self.line_start = self.pos + index + 1;
        }
        self.pos += len;
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.advance(c.len_utf8());
        }
    }

    /// Runs a winnow recognizer on the remaining input and advances past
    /// whatever it consumed.
    fn eat<O>(&mut self, mut parser: impl Parser<&'a str, O, ErrMode<ContextError>>) -> Option<O> {
        let text = self.text;
        let mut input = &text[self.pos..];
        let before = input.len();
        let output = parser.parse_next(&mut input).ok()?;
        self.advance(before - input.len());
        Some(output)
    }

    /// Consumes a name run, leaving trailing horizontal whitespace for the
    /// next token so names come out trimmed.
    fn eat_name(&mut self, stop: impl Fn(char) -> bool + Copy) {
        let text = self.text;
        let mut input = &text[self.pos..];
        match name_run(&mut input, stop) {
            Ok(run) => self.advance(run.trim_end_matches([' ', '\t']).len()),
            Err(_) => self.bump(),
        }
    }

    /// Names run on across control characters; each one inside a name still
    /// gets a diagnostic.
    fn report_embedded_controls(&self, start: Mark, span: Span, diagnostics: &mut Diagnostics) {
        let name = span.text(self.text);
        for (column, (index, c)) in name.char_indices().enumerate() {
            if c != '\t' && c.is_control() {
                let at = Span::new(
                    start.offset + index,
                    start.offset + index + c.len_utf8(),
                    start.line,
                    start.column + column,
                );
                diagnostics.push(DiagnosticKind::ControlCharacter(c), at);
            }
        }
    }

    fn skip_control_characters(&mut self, diagnostics: &mut Diagnostics) {
        while let Some(c) = self.peek() {
            let stray = match c {
                '\n' | '\t' => false,
                '\r' => !self.is_at("\r\n"),
                c => c.is_control(),
            };
            if !stray {
                break;
            }
            let start = self.mark();
            self.bump();
            diagnostics.push(DiagnosticKind::ControlCharacter(c), start.span_to(self.pos));
        }
    }

    fn scan_newline(&mut self) -> TokenKind {
        if self.eat(line_ending).is_none() {
            self.bump();
        }
        TokenKind::Newline
    }

    fn scan_whitespace(&mut self) -> TokenKind {
        self.eat(horizontal_space);
        TokenKind::Whitespace
    }

    fn scan_comment(&mut self) -> TokenKind {
        let collapse = self.collapse_comments && self.at_line_start();
        self.eat(raw_line);
        if collapse {
            while self.eat(continued_comment).is_some() {}
        }
        TokenKind::Comment
    }

    fn scan_default(&mut self) -> TokenKind {
        match self.peek() {
            None => TokenKind::Eof,
            Some('\n' | '\r') => self.scan_newline(),
            Some(' ' | '\t') => self.scan_whitespace(),
            Some('#' | ';') => self.scan_comment(),
            Some('[') => {
                self.bump();
                TokenKind::LeftBracket
            }
            Some(_) => {
                if self.eat(rest_of_line).is_none() {
                    self.bump();
                }
                TokenKind::Unexpected
            }
        }
    }

    fn scan_header(&mut self, condition: bool) -> TokenKind {
        match self.peek() {
            None => TokenKind::Eof,
            Some('\n' | '\r') => self.scan_newline(),
            Some(' ' | '\t') => self.scan_whitespace(),
            Some(']') => {
                self.bump();
                TokenKind::RightBracket
            }
            Some(':') if !condition => {
                self.bump();
                TokenKind::Colon
            }
            Some('[') if !condition => {
                self.bump();
                TokenKind::Unexpected
            }
            Some(_) if condition => {
                self.eat_name(|c| c == ']');
                TokenKind::Condition
            }
            Some(_) => {
                self.eat_name(|c| matches!(c, '[' | ']' | ':'));
                TokenKind::SectionName
            }
        }
    }

    fn scan_option_name(&mut self) -> TokenKind {
        match self.peek() {
            None => TokenKind::Eof,
            Some('\n' | '\r') => self.scan_newline(),
            Some(' ' | '\t') => self.scan_whitespace(),
            Some('=') if self.is_at("=>") && self.at_line_start() => {
                self.advance(2);
                TokenKind::PartDependencies
            }
            Some('=') => {
                self.bump();
                TokenKind::Assign(AssignOp::Set)
            }
            Some('+') if self.is_at("+=") => {
                self.advance(2);
                TokenKind::Assign(AssignOp::Append)
            }
            Some('-') if self.is_at("-=") => {
                self.advance(2);
                TokenKind::Assign(AssignOp::Remove)
            }
            Some('#' | ';' | '[') => {
                self.bump();
                TokenKind::Unexpected
            }
            Some(_) => {
                let rest = self.rest();
                let mut input = rest;
                let run = name_run(&mut input, |c| {
                    matches!(c, '=' | '#' | ';' | '[' | ' ' | '\t')
                })
                .unwrap_or_default();
                let mut len = run.len();
                // `name+=` and `name-=`: the sign belongs to the operator.
                if len > 1 && run.ends_with(['+', '-']) && rest[len..].starts_with('=') {
                    len -= 1;
                }
                if len == 0 {
                    self.bump();
                } else {
                    self.advance(len);
                }
                TokenKind::OptionName
            }
        }
    }

    fn scan_value(&mut self) -> TokenKind {
        match self.peek() {
            None => TokenKind::Eof,
            Some('\n' | '\r') => self.scan_newline(),
            Some('$') if self.is_at("${") => {
                if reference_is_closed(&self.rest()[2..]) {
                    self.advance(2);
                    TokenKind::ReferenceOpen
                } else {
                    self.eat(rest_of_line);
                    TokenKind::Invalid
                }
            }
            Some(_) => {
                if self.eat(value_text).is_none() {
                    self.bump();
                }
                TokenKind::Text
            }
        }
    }

    fn scan_reference(&mut self, after_colon: bool) -> TokenKind {
        match self.peek() {
            None => TokenKind::Eof,
            Some('\n' | '\r') => self.scan_newline(),
            Some(' ' | '\t') => self.scan_whitespace(),
            Some('}') => {
                self.bump();
                TokenKind::ReferenceClose
            }
            Some(':') if !after_colon => {
                self.bump();
                TokenKind::Colon
            }
            Some(_) => {
                self.eat_name(|c| c == '}' || (!after_colon && c == ':'));
                TokenKind::ReferenceName
            }
        }
    }

    /// Decides whether the line at the cursor continues a value.
    ///
    /// Blank lines and column-0 comments never end a value; a line with
    /// content continues it only when indented past the option's line.
    fn scan_continuation(&mut self, baseline: Baseline) -> TokenKind {
        let rest = self.rest();
        if rest.is_empty() {
            return TokenKind::EndOfValue;
        }
        let indent = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let content = &rest[indent..];
        if content.is_empty() || content.starts_with('\n') || content.starts_with("\r\n") {
            self.advance(indent);
            self.eat(line_ending);
            return TokenKind::Blank;
        }
        if indent == 0 && content.starts_with(['#', ';']) {
            return self.scan_comment();
        }
        if indent > baseline.option_indent {
            let strip = baseline.block_indent.map_or(indent, |block| block.min(indent));
            self.advance(strip);
            return TokenKind::Indent;
        }
        TokenKind::EndOfValue
    }
}

/// Line endings and control characters end value text and unexpected input.
fn is_break(c: char) -> bool {
    c == '\n' || c == '\r' || (c.is_control() && c != '\t')
}

/// Whether a `}` follows on the same line.
fn reference_is_closed(after_open: &str) -> bool {
    let line = after_open
        .find('\n')
        .map_or(after_open, |end| &after_open[..end]);
    line.contains('}')
}

fn line_ending<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    alt(("\r\n", "\n")).parse_next(input)
}

fn horizontal_space<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., [' ', '\t']).parse_next(input)
}

/// A name: at least one character, up to `stop` or the line ending. Control
/// characters, a lone `\r` among them, do not end it.
fn name_run<'i>(input: &mut &'i str, stop: impl Fn(char) -> bool + Copy) -> ModalResult<&'i str> {
    repeat(
        1..,
        alt((
            take_till(1.., move |c: char| stop(c) || c == '\r' || c == '\n'),
            ('\r', not('\n')).take(),
        )),
    )
    .map(|()| ())
    .take()
    .parse_next(input)
}

/// Text up to the next line ending or control character.
fn rest_of_line<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_till(1.., is_break).parse_next(input)
}

/// Everything up to the line ending, control characters included.
fn raw_line<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    repeat(
        0..,
        alt((take_till(1.., ['\r', '\n']), ('\r', not('\n')).take())),
    )
    .map(|()| ())
    .take()
    .parse_next(input)
}

/// A line ending followed by another comment line.
fn continued_comment<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (line_ending, one_of(['#', ';']), raw_line)
        .take()
        .parse_next(input)
}

/// Literal value text: stops before `${` and at the end of the line. A `$`
/// not followed by `{` is plain text.
fn value_text<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    repeat(
        1..,
        alt((
            take_till(1.., |c: char| c == '$' || is_break(c)),
            ('$', not('{')).take(),
        )),
    )
    .map(|()| ())
    .take()
    .parse_next(input)
}
