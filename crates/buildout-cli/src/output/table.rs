//! Table formatting utilities for CLI output.

use buildout::parser::{Profile, ValueKind};
use comfy_table::{presets, ContentArrangement, Table};

/// Format the sections and options of a profile as a table.
pub fn format_outline_table(profile: &Profile) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Section", "Option", "Value", "Location"]);

    for section in &profile.sections {
        let name = match &section.condition {
            Some(condition) => format!("[{}:{}]", section.name, condition),
            None => format!("[{}]", section.name),
        };
        table.add_row(vec![
            name,
            String::new(),
            String::new(),
            location(section.span.line, section.span.column),
        ]);
        for option in &section.options {
            let value = match option.value.kind {
                ValueKind::MonoLine => "mono-line",
                ValueKind::MultiLine => "multi-line",
            };
            table.add_row(vec![
                String::new(),
                format!("{} {}", option.name, option.operator),
                format!("{value}, {} rows", option.value.rows().len()),
                location(option.span.line, option.span.column),
            ]);
        }
    }

    table
}

/// One reference and whether it resolves within the profile.
pub struct ReferenceRow {
    pub reference: String,
    pub used_in: String,
    pub line: usize,
    pub column: usize,
    pub resolved: bool,
}

/// Format references as a table.
pub fn format_references_table(rows: &[ReferenceRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Reference", "Used in", "Location", "Resolved"]);

    for row in rows {
        table.add_row(vec![
            row.reference.clone(),
            row.used_in.clone(),
            location(row.line, row.column),
            if row.resolved { "yes" } else { "no" }.to_string(),
        ]);
    }

    table
}

fn location(line: usize, column: usize) -> String {
    format!("{line}:{column}")
}
