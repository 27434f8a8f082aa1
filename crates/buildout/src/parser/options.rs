//! Parser configuration.

use bon::Builder;

/// Options controlling how a profile is parsed.
///
/// # Example
///
/// ```
/// use buildout::parser::{ParseOptions, parse_with};
///
/// let options = ParseOptions::builder()
///     .collapse_comments(false)
///     .max_diagnostics(10)
///     .build();
///
/// let parsed = parse_with("# one\n# two\n[main]\n", &options);
/// assert_eq!(parsed.profile.trivia.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ParseOptions {
    /// Recognise the `=> parts` shorthand for the `<part-dependencies>` option.
    #[builder(default = true)]
    pub part_dependencies: bool,

    /// Merge consecutive column-0 comment lines into one trivia node.
    #[builder(default = true)]
    pub collapse_comments: bool,

    /// Stop recording diagnostics after this many. Parsing itself continues.
    pub max_diagnostics: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::builder().build()
    }
}
