//! Source locations.

use std::ops::Range;

use serde::Serialize;

/// A half-open byte range `[start, end)` into the parsed text, together with
/// the 1-based line and column (in characters) of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A zero-width span at `start`.
    pub fn empty(start: usize, line: usize, column: usize) -> Self {
        Self::new(start, start, line, column)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The slice of `source` covered by this span.
    ///
    /// Returns an empty string when the span does not fit `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.range()).unwrap_or_default()
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// A span starting where `self` starts and ending where `other` ends.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            end: other.end.max(self.start),
            ..*self
        }
    }

    pub(crate) fn shift(&mut self, by: Shift) {
        self.start = by.apply_offset(self.start);
        self.end = by.apply_offset(self.end);
        self.line = by.apply_line(self.line);
    }
}

/// An edit applied to a previously parsed text.
///
/// Offsets are byte offsets: `[start, old_end)` in the old text was replaced
/// by `[start, new_end)` in the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl TextEdit {
    pub fn new(start: usize, old_end: usize, new_end: usize) -> Self {
        Self {
            start,
            old_end,
            new_end,
        }
    }

    /// Signed change in text length.
    pub fn delta(&self) -> isize {
        self.new_end as isize - self.old_end as isize
    }
}

/// Displacement applied to nodes that follow an edit.
///
/// Only nodes starting on a line after the edit are shifted, so columns never
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Shift {
    pub bytes: isize,
    pub lines: isize,
}

impl Shift {
    fn apply_offset(self, offset: usize) -> usize {
        offset.saturating_add_signed(self.bytes)
    }

    fn apply_line(self, line: usize) -> usize {
        line.saturating_add_signed(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_slices_source() {
        let source = "[main]\nkey = value\n";
        let span = Span::new(1, 5, 1, 2);
        assert_eq!(span.text(source), "main");
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn out_of_range_text_is_empty() {
        let span = Span::new(10, 20, 1, 11);
        assert_eq!(span.text("short"), "");
    }

    #[test]
    fn shift_moves_offsets_and_lines() {
        let mut span = Span::new(10, 14, 3, 1);
        span.shift(Shift {
            bytes: -4,
            lines: 1,
        });
        assert_eq!(span, Span::new(6, 10, 4, 1));
    }

    #[test]
    fn edit_delta() {
        assert_eq!(TextEdit::new(4, 10, 6).delta(), -4);
        assert_eq!(TextEdit::new(4, 4, 9).delta(), 5);
    }
}
