//! Implementation of the `buildout refs` command.

use std::collections::BTreeSet;
use std::path::PathBuf;

use buildout::parser::{Profile, ReferenceSite};
use miette::{IntoDiagnostic, Report, Result};
use serde::Serialize;
use strsim::damerau_levenshtein;

use super::load_profile;
use crate::output::table::{format_references_table, ReferenceRow};
use crate::output::ReferenceDiagnostic;

/// Options buildout defines in the `[buildout]` section without a profile
/// mentioning them.
const BUILDOUT_DEFAULT_OPTIONS: &[&str] = &[
    "allow-hosts",
    "allow-picked-versions",
    "bin-directory",
    "develop-eggs-directory",
    "directory",
    "eggs-directory",
    "executable",
    "find-links",
    "install-from-cache",
    "installed",
    "log-format",
    "log-level",
    "newest",
    "offline",
    "parts-directory",
    "prefer-final",
    "python",
    "show-picked-versions",
    "socket-timeout",
    "update-versions-file",
    "use-dependency-links",
];

/// Defined by buildout in every section.
const IMPLICIT_SECTION_OPTIONS: &[&str] = &["_buildout_section_name_", "_profile_base_location_"];

/// Arguments for the refs command.
#[derive(Debug, clap::Args)]
pub struct RefsArgs {
    /// Profile to inspect (.cfg)
    pub file: PathBuf,

    /// Exit with a non-zero code if any reference does not resolve
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// How a reference relates to the definitions in the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Resolution {
    Resolved,
    UnknownSection { suggestions: Vec<String> },
    UnknownOption { suggestions: Vec<String> },
}

/// JSON output for one reference.
#[derive(Debug, Serialize)]
struct ReferenceJson {
    reference: String,
    section: String,
    option: String,
    line: usize,
    column: usize,
    #[serde(flatten)]
    resolution: Resolution,
}

/// Run the refs command.
pub fn run_refs(args: RefsArgs) -> Result<i32> {
    let (content, parsed) = load_profile(&args.file)?;
    let profile = &parsed.profile;

    let resolved: Vec<(ReferenceSite<'_>, Resolution)> = profile
        .references()
        .map(|site| {
            let resolution = resolve(profile, &site);
            (site, resolution)
        })
        .collect();
    let unresolved = resolved
        .iter()
        .filter(|(_, r)| *r != Resolution::Resolved)
        .count();
    log::debug!(
        "{} references, {} unresolved",
        resolved.len(),
        unresolved
    );

    if args.json {
        let json_data: Vec<ReferenceJson> = resolved
            .iter()
            .map(|(site, resolution)| ReferenceJson {
                reference: site.reference.to_string(),
                section: site.section.name.clone(),
                option: site.option.name.clone(),
                line: site.reference.span.line,
                column: site.reference.span.column,
                resolution: resolution.clone(),
            })
            .collect();
        let json_output = serde_json::to_string_pretty(&json_data).into_diagnostic()?;
        println!("{}", json_output);
    } else {
        let rows: Vec<ReferenceRow> = resolved
            .iter()
            .map(|(site, resolution)| ReferenceRow {
                reference: site.reference.to_string(),
                used_in: format!("{}:{}", site.section.name, site.option.name),
                line: site.reference.span.line,
                column: site.reference.span.column,
                resolved: *resolution == Resolution::Resolved,
            })
            .collect();
        println!("{}", format_references_table(&rows));

        for (site, resolution) in &resolved {
            let (message, suggestions) = match resolution {
                Resolution::Resolved => continue,
                Resolution::UnknownSection { suggestions } => (
                    format!("section `{}` does not exist", site.target_section()),
                    suggestions,
                ),
                Resolution::UnknownOption { suggestions } => (
                    format!(
                        "section `{}` does not have option `{}`",
                        site.target_section(),
                        site.reference.option
                    ),
                    suggestions,
                ),
            };
            let span = site.reference.span;
            let diagnostic = ReferenceDiagnostic::new(
                &args.file,
                &content,
                (span.start, span.len()),
                message,
                suggestions,
            );
            eprintln!("{:?}", Report::new(diagnostic));
        }
    }

    if args.strict && unresolved > 0 {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}

fn resolve(profile: &Profile, site: &ReferenceSite<'_>) -> Resolution {
    let target = site.target_section();
    let option = site.reference.option.as_str();
    let is_default = target == "buildout" && BUILDOUT_DEFAULT_OPTIONS.contains(&option);

    let sections: Vec<_> = profile.sections_named(target).collect();
    if sections.is_empty() {
        if is_default {
            return Resolution::Resolved;
        }
        let names: BTreeSet<&str> = profile.sections.iter().map(|s| s.name.as_str()).collect();
        return Resolution::UnknownSection {
            suggestions: compute_suggestions(target, names.into_iter()),
        };
    }

    let defined = IMPLICIT_SECTION_OPTIONS.contains(&option)
        || is_default
        || sections.iter().any(|s| s.option(option).is_some());
    if defined {
        return Resolution::Resolved;
    }
    let names: BTreeSet<&str> = sections
        .iter()
        .flat_map(|s| s.options.iter().map(|o| o.name.as_str()))
        .collect();
    Resolution::UnknownOption {
        suggestions: compute_suggestions(option, names.into_iter()),
    }
}

/// At most this many names are offered for one typo.
const MAX_SUGGESTIONS: usize = 3;

/// Known names close enough to `name` to be what the author meant.
///
/// Transposed letters count as one edit. The allowed distance grows with the
/// name: one edit up to three characters, two up to eight, three beyond.
/// Closest names come first, ties in name order.
fn compute_suggestions<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> Vec<String> {
    let allowed = match name.chars().count() {
        0..=3 => 1,
        4..=8 => 2,
        _ => 3,
    };
    let mut close: Vec<(usize, &str)> = known
        .map(|candidate| (damerau_levenshtein(name, candidate), candidate))
        .filter(|&(distance, _)| (1..=allowed).contains(&distance))
        .collect();
    close.sort_unstable();
    close
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use buildout::parser::parse;

    use super::*;
    use crate::commands::test_support::profile;

    fn resolutions(text: &str) -> Vec<Resolution> {
        let parsed = parse(text);
        parsed
            .profile
            .references()
            .map(|site| resolve(&parsed.profile, &site))
            .collect()
    }

    #[test]
    fn references_within_the_profile_resolve() {
        let text = "[buildout]\nparts = app\n[app]\nname = demo\nscript = ${:name} ${buildout:parts}\n";
        assert_eq!(
            resolutions(text),
            vec![Resolution::Resolved, Resolution::Resolved]
        );
    }

    #[test]
    fn buildout_defaults_resolve() {
        let text = "[app]\nlocation = ${buildout:parts-directory}/app\nself = ${:_buildout_section_name_}\n";
        assert_eq!(
            resolutions(text),
            vec![Resolution::Resolved, Resolution::Resolved]
        );
    }

    #[test]
    fn implicit_section_options_resolve() {
        let text = "[app]\nbase = ${:_profile_base_location_}\nname = ${app:_buildout_section_name_}\n";
        assert_eq!(
            resolutions(text),
            vec![Resolution::Resolved, Resolution::Resolved]
        );
    }

    #[test]
    fn unknown_section_gets_suggestions() {
        let text = "[python]\nexe = x\n[app]\nbin = ${pyhton:exe}\n";
        assert_eq!(
            resolutions(text),
            vec![Resolution::UnknownSection {
                suggestions: vec!["python".to_string()]
            }]
        );
    }

    #[test]
    fn unknown_option_gets_suggestions() {
        let text = "[app]\nrecipe = x\nuse = ${:recipes}\n";
        assert_eq!(
            resolutions(text),
            vec![Resolution::UnknownOption {
                suggestions: vec!["recipe".to_string()]
            }]
        );
    }

    #[test]
    fn suggestions_limit_to_three() {
        let names = ["aaaa", "aaab", "aaac", "aaad", "zzzz"];
        let suggestions = compute_suggestions("aaax", names.into_iter());
        assert_eq!(suggestions, vec!["aaaa", "aaab", "aaac"]);
    }

    #[test]
    fn suggestions_allow_more_edits_for_long_names() {
        let names = ["parts-directory", "eggs-directory", "bin"];
        let suggestions = compute_suggestions("part-dirctory", names.into_iter());
        assert_eq!(suggestions, vec!["parts-directory"]);
        assert_eq!(compute_suggestions("bni", ["bin"].into_iter()), vec!["bin"]);
        assert!(compute_suggestions("xyz", ["bin"].into_iter()).is_empty());
    }

    #[test]
    fn strict_mode_fails_on_unresolved() {
        let (_dir, path) = profile("[app]\nx = ${missing:y}\n");
        let code = run_refs(RefsArgs {
            file: path.clone(),
            strict: true,
            json: false,
        })
        .unwrap();
        assert_eq!(code, exitcode::DATAERR);

        let code = run_refs(RefsArgs {
            file: path,
            strict: false,
            json: true,
        })
        .unwrap();
        assert_eq!(code, exitcode::OK);
    }
}
