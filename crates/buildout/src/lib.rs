//! Parser for zc.buildout configuration profiles.
//!
//! Produces a lossless syntax tree with byte spans for every node, keeps
//! comments as trivia, and recovers from malformed input so editor tooling
//! always gets a tree to work with.

pub mod parser;

pub use parser::{
    Diagnostic, DiagnosticKind, ErrorClass, Parse, ParseOptions, Profile, Span, TextEdit, parse,
    parse_with, reparse, reparse_with,
};
