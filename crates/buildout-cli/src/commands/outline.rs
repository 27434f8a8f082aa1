//! Implementation of the `buildout outline` command.

use std::path::PathBuf;

use buildout::parser::Profile;
use miette::{IntoDiagnostic, Result};

use super::load_profile;
use crate::output::table::format_outline_table;

/// Arguments for the outline command.
#[derive(Debug, clap::Args)]
pub struct OutlineArgs {
    /// Profile to outline (.cfg)
    pub file: PathBuf,

    /// Output the syntax tree as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the outline command.
pub fn run_outline(args: OutlineArgs) -> Result<i32> {
    let (_, parsed) = load_profile(&args.file)?;
    if parsed.has_diagnostics() {
        log::warn!(
            "{} has {} syntax problems; run `buildout check` for details",
            args.file.display(),
            parsed.diagnostics.len()
        );
    }

    if args.json {
        println!("{}", render_json(&parsed.profile)?);
    } else {
        println!("{}", format_outline_table(&parsed.profile));
    }
    Ok(exitcode::OK)
}

fn render_json(profile: &Profile) -> Result<String> {
    serde_json::to_string_pretty(profile).into_diagnostic()
}
