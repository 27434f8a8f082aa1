//! Buildout CLI entry point.
//!
//! Provides command-line tools for working with buildout profiles:
//! - `buildout check` - Report syntax problems
//! - `buildout outline` - List sections and options
//! - `buildout refs` - List `${section:option}` references

mod commands;
mod output;

use std::process::exit;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{run_check, run_outline, run_refs, CheckArgs, OutlineArgs, RefsArgs};
use log::LevelFilter;

/// Buildout profile tools.
#[derive(Debug, Parser)]
#[command(name = "buildout")]
#[command(about = "Buildout profile tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Color output control
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto, global = true)]
    pub color: ColorWhen,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// When to use colored output.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check profile syntax
    Check(CheckArgs),
    /// Show the sections and options of a profile
    Outline(OutlineArgs),
    /// List references and report the ones that do not resolve
    Refs(RefsArgs),
}

impl ColorWhen {
    /// The color setting to force, or `None` to let the terminal decide
    /// (TTY detection, `NO_COLOR`, `FORCE_COLOR`).
    fn forced(self) -> Option<bool> {
        match self {
            ColorWhen::Auto => None,
            ColorWhen::Always => Some(true),
            ColorWhen::Never => Some(false),
        }
    }
}

/// `RUST_LOG` wins over the default level.
fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let color = cli.color.forced();
    if let Some(enabled) = color {
        owo_colors::set_override(enabled);
    }
    setup_logging(cli.verbose);

    // Reports follow the same color choice as tables.
    miette::set_hook(Box::new(move |_| {
        let mut handler = miette::MietteHandlerOpts::new()
            .terminal_links(true)
            .unicode(true)
            .context_lines(2);
        if let Some(enabled) = color {
            handler = handler.color(enabled);
        }
        Box::new(handler.build())
    }))?;

    let result = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Outline(args) => run_outline(args),
        Commands::Refs(args) => run_refs(args),
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("{:?}", e);
            exit(exitcode::SOFTWARE);
        }
    }
}
