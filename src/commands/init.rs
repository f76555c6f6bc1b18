//! # Init Command Implementation
//!
//! This module implements the `init` subcommand, which generates a new
//! project from a template and writes its `.project-kit.yaml` manifest.
//!
//! ## Functionality
//!
//! - **Template Source**: a local directory or a git URL, from `--source` or
//!   the `PROJECT_KIT_SOURCE` environment variable
//! - **Core Components**: components the catalog marks as non-removable are
//!   always enabled
//! - **Initial Units**: further components and services can be named on the
//!   command line (`database:sqlite`, `auth`, ...)
//! - **Variables**: `--var key=value` sets render variables; `project_name`
//!   defaults to the directory name
//! - **Frozen Projects**: `--frozen` generates a project that rejects later
//!   mutation

use anyhow::Result;
use clap::Args;

use project_kit::orchestrator::{InitOptions, Session};
use project_kit::output::emoji;
use project_kit::resolver::Mode;
use project_kit::source;
use project_kit::suggestions;

use super::{confirm_implied, effective_mode, print_report, Context};

/// Generate a new project from a template
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Components and services to enable besides the core (e.g. `database:sqlite`)
    #[arg(value_name = "UNIT")]
    pub units: Vec<String>,

    /// Template directory or git URL
    #[arg(short, long, value_name = "SOURCE", env = "PROJECT_KIT_SOURCE")]
    pub source: Option<String>,

    /// Template revision to start from (default: latest)
    #[arg(short, long, value_name = "REV")]
    pub revision: Option<String>,

    /// Render variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// How to treat missing dependencies (default: auto on a terminal, strict otherwise)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Overwrite existing files, keeping a `.backup` copy
    #[arg(short, long)]
    pub force: bool,

    /// Generate a project that cannot be mutated afterwards
    #[arg(long)]
    pub frozen: bool,

    /// Show what would be written without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask before enabling required components
    #[arg(short, long)]
    pub yes: bool,
}

/// Parse a `KEY=VALUE` pair.
fn parse_var(input: &str) -> std::result::Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", input)),
    }
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, context: &Context) -> Result<()> {
    let Some(spec) = args.source.as_deref() else {
        return Err(suggestions::source_not_configured());
    };

    let cwd = std::env::current_dir()?;
    let spec = source::normalize_spec(spec, &cwd)?;
    let template = source::open(&spec, &cwd, &context.cache_root);
    let session = Session::new(&context.project, template)?;

    println!(
        "{} Generating project in {} from {}",
        emoji(&context.output, "🎯", "[INIT]"),
        context.project.display(),
        spec
    );

    let options = InitOptions {
        source: spec,
        revision: args.revision,
        units: args.units,
        variables: args.vars.into_iter().collect(),
        mode: effective_mode(args.mode),
        force: args.force,
        frozen: args.frozen,
    };
    let change = session.prepare_init(&options)?;

    let report = if args.dry_run {
        session.preview(change)?
    } else {
        if !confirm_implied(&change, args.yes)? {
            println!("Aborted.");
            return Ok(());
        }
        let revision = change.manifest().template_revision.clone();
        let report = session.commit(change)?;
        println!(
            "{} Project initialised at revision {}",
            emoji(&context.output, "✅", "[OK]"),
            revision
        );
        report
    };

    print_report(&context.output, &report);
    Ok(())
}
