//! # Add Command Implementation
//!
//! This module implements the `add` subcommand, which enables components and
//! services in an existing project.
//!
//! ## Functionality
//!
//! - **Variants**: `name:variant` picks a variant; adding an enabled
//!   component with another variant switches it
//! - **Dependency Modes**: `--mode auto` enables missing dependencies,
//!   `--mode strict` reports them instead
//! - **Confirmation**: auto-enabled dependencies are confirmed on a terminal
//!   unless `--yes`
//! - **Safe Writes**: files the user changed are skipped unless `--force`,
//!   which keeps a `.backup` copy

use anyhow::Result;
use clap::Args;

use project_kit::orchestrator::{ChangeOptions, Session};
use project_kit::resolver::Mode;

use super::{confirm_implied, effective_mode, print_report, Context};

/// Enable components or services
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Components (`name` or `name:variant`) and services to enable
    #[arg(value_name = "UNIT", required = true)]
    pub units: Vec<String>,

    /// How to treat missing dependencies (default: auto on a terminal, strict otherwise)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Overwrite files that differ from the template, keeping a `.backup` copy
    #[arg(short, long)]
    pub force: bool,

    /// Show what would change without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask before enabling required components
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the `add` command.
pub fn execute(args: AddArgs, context: &Context) -> Result<()> {
    context.ensure_project()?;
    let session = Session::for_project(&context.project, &context.cache_root)?;

    let options = ChangeOptions {
        mode: effective_mode(args.mode),
        force: args.force,
        dry_run: args.dry_run,
    };
    let change = session.prepare_add(&args.units, &options)?;

    let report = if args.dry_run {
        session.preview(change)?
    } else {
        if !confirm_implied(&change, args.yes)? {
            println!("Aborted. Nothing was changed.");
            return Ok(());
        }
        session.commit(change)?
    };

    print_report(&context.output, &report);
    Ok(())
}
