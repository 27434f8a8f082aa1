//! Incremental reparsing.
//!
//! A column-0 `[` always starts a fresh section, so the parser state there
//! does not depend on anything before it. After an edit only the sections
//! from the one containing the edit up to the first untouched section are
//! scanned again; everything before is reused and everything after is
//! shifted into place.

use super::ast::{Profile, Section};
use super::error::Diagnostic;
use super::grammar::Grammar;
use super::options::ParseOptions;
use super::scanner::Scanner;
use super::span::{Shift, Span, TextEdit};
use super::{Parse, parse_with};

/// Reparses `new_text` after `edit` was applied to the text behind `old`,
/// using the default [`ParseOptions`].
///
/// The result is the same as `parse(new_text)`.
pub fn reparse(old: &Parse, edit: TextEdit, new_text: &str) -> Parse {
    reparse_with(old, edit, new_text, &ParseOptions::default())
}

/// Reparses `new_text` after `edit`, reusing the parts of `old` the edit
/// cannot have changed.
///
/// `old` must have been produced with the same `options`. When the edit does
/// not line up with `old` and `new_text`, the whole text is parsed again.
pub fn reparse_with(old: &Parse, edit: TextEdit, new_text: &str, options: &ParseOptions) -> Parse {
    let Some(window) = Window::locate(old, edit, new_text, options) else {
        log::debug!("edit {edit:?} does not apply to the previous parse, parsing in full");
        return parse_with(new_text, options);
    };

    let rescanned = &new_text[..window.resume_new];
    let scanner = if window.restart == 0 {
        Scanner::new(rescanned, options.collapse_comments)
    } else {
        Scanner::starting_at(
            rescanned,
            window.restart,
            window.restart_line,
            options.collapse_comments,
        )
    };
    let output = Grammar::new(scanner, options).profile();
    log::debug!(
        "reparse reused {} sections, rescanned {}, shifted {}",
        window.restart_index,
        output.sections.len(),
        old.profile.sections.len() - window.resume_index
    );

    let shift = Shift {
        bytes: edit.delta(),
        lines: window.line_delta(old, new_text),
    };
    // Without a resumed section the rescan runs to the end of input and
    // reproduces everything after the window itself.
    let has_suffix = window.resume_index < old.profile.sections.len();
    let resume_old = window.resume_old(old);
    let before = |span: &Span| span.start < window.restart;
    let after = |span: &Span| has_suffix && span.start >= resume_old;

    let mut sections: Vec<Section> = old.profile.sections[..window.restart_index].to_vec();
    sections.extend(output.sections);
    sections.extend(
        old.profile.sections[window.resume_index..]
            .iter()
            .cloned()
            .map(|mut section| {
                section.shift(shift);
                section
            }),
    );

    let mut trivia: Vec<_> = old
        .profile
        .trivia
        .iter()
        .filter(|t| before(&t.span))
        .copied()
        .collect();
    trivia.extend(output.trivia);
    trivia.extend(
        old.profile
            .trivia
            .iter()
            .filter(|t| after(&t.span))
            .map(|t| {
                let mut t = *t;
                t.shift(shift);
                t
            }),
    );

    let mut diagnostics: Vec<Diagnostic> = old
        .diagnostics
        .iter()
        .filter(|d| before(&d.span))
        .cloned()
        .collect();
    diagnostics.extend(output.diagnostics);
    diagnostics.extend(old.diagnostics.iter().filter(|d| after(&d.span)).map(|d| {
        let mut d = d.clone();
        d.shift(shift);
        d
    }));
    if let Some(limit) = options.max_diagnostics {
        diagnostics.truncate(limit);
    }

    Parse {
        profile: Profile {
            sections,
            trivia,
            span: Span::new(0, new_text.len(), 1, 1),
        },
        diagnostics,
    }
}

/// The stretch of text that has to be scanned again.
#[derive(Debug)]
struct Window {
    /// Old sections before this index are reused as they are.
    restart_index: usize,
    /// Start of the rescanned text, identical in the old and new text.
    restart: usize,
    restart_line: usize,
    /// Old sections from this index on are shifted.
    resume_index: usize,
    /// End of the rescanned text in the new text.
    resume_new: usize,
}

impl Window {
    fn locate(old: &Parse, edit: TextEdit, new_text: &str, options: &ParseOptions) -> Option<Self> {
        let old_len = old.profile.span.end;
        let consistent = edit.start <= edit.old_end
            && edit.start <= edit.new_end
            && edit.old_end <= old_len
            && new_text.len() == old_len - (edit.old_end - edit.start) + (edit.new_end - edit.start)
            && new_text.is_char_boundary(edit.start)
            && new_text.is_char_boundary(edit.new_end);
        if !consistent {
            return None;
        }
        // Diagnostics past the cap were never recorded, so the old ones after
        // the edit cannot be trusted.
        if options
            .max_diagnostics
            .is_some_and(|limit| old.diagnostics.len() >= limit)
        {
            return None;
        }

        let sections = &old.profile.sections;
        let restart_index = sections
            .iter()
            .rposition(|s| s.span.start < edit.start)
            .unwrap_or(0);
        let (restart, restart_line) = match sections.get(restart_index) {
            Some(section) if section.span.start < edit.start => {
                (section.span.start, section.span.line)
            }
            _ => (0, 1),
        };
        let resume_index = sections
            .iter()
            .position(|s| s.span.start > edit.old_end)
            .unwrap_or(sections.len());
        let resume_new = match sections.get(resume_index) {
            Some(section) => section.span.start.checked_add_signed(edit.delta())?,
            None => new_text.len(),
        };
        if resume_new < restart || resume_new > new_text.len() {
            return None;
        }
        // The resumed `[` must still open a line, which a leading byte-order
        // mark in front of it does not guarantee.
        if resume_index < sections.len() && !new_text[..resume_new].ends_with('\n') {
            return None;
        }

        Some(Window {
            restart_index: if restart == 0 { 0 } else { restart_index },
            restart,
            restart_line,
            resume_index,
            resume_new,
        })
    }

    fn resume_old(&self, old: &Parse) -> usize {
        old.profile
            .sections
            .get(self.resume_index)
            .map_or(old.profile.span.end, |s| s.span.start)
    }

    /// How far the first shifted section moved, in lines.
    fn line_delta(&self, old: &Parse, new_text: &str) -> isize {
        let Some(section) = old.profile.sections.get(self.resume_index) else {
            return 0;
        };
        let new_line = self.restart_line + new_text[self.restart..self.resume_new].matches('\n').count();
        new_line as isize - section.span.line as isize
    }
}
