//! Parse diagnostics.
//!
//! Nothing in the parser fails: every problem is recorded as a [`Diagnostic`]
//! next to a best-effort tree and the caller decides what is fatal.

use serde::Serialize;
use thiserror::Error;

use super::span::{Shift, Span};

/// Broad category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorClass {
    /// Invalid character sequences found by the scanner.
    Lexical,
    /// Input that scans fine but does not fit the grammar.
    Structural,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum DiagnosticKind {
    #[error("unterminated reference: missing '}}' before end of line")]
    UnterminatedReference,

    #[error("unexpected control character {0:?}")]
    ControlCharacter(char),

    #[error("section header is missing its closing ']'")]
    MissingCloseBracket,

    #[error("section name is empty")]
    EmptySectionName,

    #[error("expected '=' after option name")]
    MissingAssignment,

    #[error("option name is empty")]
    EmptyOptionName,

    #[error("reference does not name an option")]
    EmptyReferenceOption,

    #[error("expected a section header")]
    ExpectedSectionHeader,

    #[error("unexpected indentation")]
    UnexpectedIndentation,

    #[error("unexpected text after section header")]
    TrailingHeaderText,
}

impl DiagnosticKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnterminatedReference | Self::ControlCharacter(_) => ErrorClass::Lexical,
            Self::MissingCloseBracket
            | Self::EmptySectionName
            | Self::MissingAssignment
            | Self::EmptyOptionName
            | Self::EmptyReferenceOption
            | Self::ExpectedSectionHeader
            | Self::UnexpectedIndentation
            | Self::TrailingHeaderText => ErrorClass::Structural,
        }
    }
}

/// A recoverable problem found while parsing, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}:{}: {kind}", span.line, span.column)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    pub(crate) fn shift(&mut self, by: Shift) {
        self.span.shift(by);
    }
}

/// Accumulates diagnostics for one parse call.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
    limit: Option<usize>,
    dropped: usize,
}

impl Diagnostics {
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    pub fn push(&mut self, kind: DiagnosticKind, span: Span) {
        self.push_diagnostic(Diagnostic::new(kind, span));
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if self.limit.is_some_and(|limit| self.items.len() >= limit) {
            self.dropped += 1;
            log::trace!("diagnostic limit reached, dropping: {diagnostic}");
            return;
        }
        self.items.push(diagnostic);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        if self.dropped > 0 {
            log::debug!("{} diagnostics dropped over the limit", self.dropped);
        }
        self.items
    }
}
