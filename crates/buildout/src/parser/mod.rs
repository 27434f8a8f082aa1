//! Buildout profile parser.
//!
//! [`parse`] turns profile text into a [`Profile`] tree plus the diagnostics
//! found along the way. Parsing never fails outright: malformed input is
//! skipped, recorded as trivia and reported, and the rest of the document is
//! still parsed. [`reparse`] reuses an earlier result after a text edit.

pub mod ast;
pub mod error;
mod grammar;
mod incremental;
pub mod options;
mod scanner;
pub mod span;

use serde::Serialize;

pub use ast::*;
pub use error::{Diagnostic, DiagnosticKind, ErrorClass};
pub use grammar::PART_DEPENDENCIES;
pub use incremental::{reparse, reparse_with};
pub use options::ParseOptions;
pub use span::{Span, TextEdit};

use grammar::{Grammar, Output};
use scanner::Scanner;

/// The result of parsing a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parse {
    pub profile: Profile,
    /// In the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    pub fn into_parts(self) -> (Profile, Vec<Diagnostic>) {
        (self.profile, self.diagnostics)
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn assemble(text: &str, output: Output) -> Self {
        Parse {
            profile: Profile {
                sections: output.sections,
                trivia: output.trivia,
                span: Span::new(0, text.len(), 1, 1),
            },
            diagnostics: output.diagnostics,
        }
    }
}

/// Parses a profile with the default [`ParseOptions`].
///
/// # Example
///
/// ```
/// use buildout::parser::{ValueKind, parse};
///
/// let parsed = parse("[buildout]\nparts =\n  app\n  tests\n");
/// assert!(parsed.diagnostics.is_empty());
///
/// let parts = parsed.profile.sections[0].option("parts").unwrap();
/// assert_eq!(parts.value.kind, ValueKind::MultiLine);
/// assert_eq!(parts.value.rows().len(), 2);
/// ```
pub fn parse(text: &str) -> Parse {
    parse_with(text, &ParseOptions::default())
}

/// Parses a profile.
pub fn parse_with(text: &str, options: &ParseOptions) -> Parse {
    let scanner = Scanner::new(text, options.collapse_comments);
    let output = Grammar::new(scanner, options).profile();
    log::debug!(
        "parsed {} sections with {} diagnostics",
        output.sections.len(),
        output.diagnostics.len()
    );
    Parse::assemble(text, output)
}
