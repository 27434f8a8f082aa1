//! Implementation of the `buildout check` command.

use std::path::PathBuf;

use buildout::parser::Diagnostic;
use miette::{IntoDiagnostic, Report, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use super::load_profile;
use crate::output::ProfileDiagnostic;

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Profiles to check (.cfg)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for one checked file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    diagnostics: Vec<Diagnostic>,
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> Result<i32> {
    let mut reports = Vec::new();
    let mut failed = false;

    for path in &args.files {
        let (content, parsed) = load_profile(path)?;
        failed |= parsed.has_diagnostics();

        if args.json {
            reports.push(FileReport {
                file: path.display().to_string(),
                diagnostics: parsed.diagnostics,
            });
            continue;
        }

        if parsed.diagnostics.is_empty() {
            println!(
                "{}: {}",
                path.display(),
                "ok".if_supports_color(Stream::Stdout, |t| t.green())
            );
        }
        for diagnostic in &parsed.diagnostics {
            let report = ProfileDiagnostic::from_parse_diagnostic(path, &content, diagnostic);
            eprintln!("{:?}", Report::new(report));
        }
    }

    if args.json {
        let json_output = serde_json::to_string_pretty(&reports).into_diagnostic()?;
        println!("{}", json_output);
    }

    if failed {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}
