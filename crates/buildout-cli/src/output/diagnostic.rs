//! Miette diagnostic wrapper for buildout parse diagnostics.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use std::path::Path;

use buildout::parser::{Diagnostic as ParseDiagnostic, DiagnosticKind, ErrorClass};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A miette-compatible diagnostic for one problem found in a profile.
///
/// Note: Fields are read by miette derive macros, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind}: {message}")]
#[diagnostic(code(buildout::syntax))]
pub struct ProfileDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    kind: &'static str,

    message: String,

    #[help]
    help: Option<String>,
}

impl ProfileDiagnostic {
    /// Create a diagnostic from a parser diagnostic with source context.
    pub fn from_parse_diagnostic(path: &Path, content: &str, diagnostic: &ParseDiagnostic) -> Self {
        // Clamp to the content so miette never slices out of bounds.
        let start = diagnostic.span.start.min(content.len());
        let len = diagnostic.span.len().min(content.len() - start);

        ProfileDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: (start, len).into(),
            kind: match diagnostic.class() {
                ErrorClass::Lexical => "lexical error",
                ErrorClass::Structural => "syntax error",
            },
            message: diagnostic.kind.to_string(),
            help: help_for(&diagnostic.kind).map(str::to_string),
        }
    }
}

/// A diagnostic for a reference that names an undefined section or option.
#[derive(Debug, Error, Diagnostic)]
#[error("unresolved reference: {message}")]
#[diagnostic(code(buildout::reference), severity(Warning))]
pub struct ReferenceDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("not defined in this profile")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

impl ReferenceDiagnostic {
    pub fn new(
        path: &Path,
        content: &str,
        range: (usize, usize),
        message: String,
        suggestions: &[String],
    ) -> Self {
        let help = match suggestions {
            [] => None,
            [one] => Some(format!("did you mean '{one}'?")),
            many => Some(format!("did you mean one of: {}?", many.join(", "))),
        };
        ReferenceDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: range.into(),
            message,
            help,
        }
    }
}

fn help_for(kind: &DiagnosticKind) -> Option<&'static str> {
    match kind {
        DiagnosticKind::UnterminatedReference => Some("close the reference with '}'"),
        DiagnosticKind::MissingCloseBracket => Some("section headers look like [name]"),
        DiagnosticKind::MissingAssignment => Some("options look like name = value"),
        DiagnosticKind::UnexpectedIndentation => {
            Some("only lines continuing an option value may be indented")
        }
        DiagnosticKind::TrailingHeaderText => {
            Some("only a comment may follow ']' on a header line")
        }
        DiagnosticKind::ExpectedSectionHeader => Some("options must belong to a section"),
        DiagnosticKind::EmptyReferenceOption => {
            Some("references look like ${section:option} or ${:option}")
        }
        DiagnosticKind::ControlCharacter(_)
        | DiagnosticKind::EmptySectionName
        | DiagnosticKind::EmptyOptionName => None,
    }
}
