//! # Remove Command Implementation
//!
//! This module implements the `remove` subcommand, which disables components
//! and services and deletes the files they own. Data paths, shared files and
//! files still used by other units are kept. A removal that would leave an
//! enabled unit without its dependency is refused and changes nothing.

use anyhow::Result;
use clap::Args;

use project_kit::orchestrator::{ChangeOptions, Session};
use project_kit::resolver::Mode;

use super::{effective_mode, print_report, Context};

/// Disable components or services
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Components and services to disable
    #[arg(value_name = "UNIT", required = true)]
    pub units: Vec<String>,

    /// Resolution mode (default: auto on a terminal, strict otherwise)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Show what would be deleted without touching the disk
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the `remove` command.
pub fn execute(args: RemoveArgs, context: &Context) -> Result<()> {
    context.ensure_project()?;
    let session = Session::for_project(&context.project, &context.cache_root)?;

    let report = session.remove(
        &args.units,
        &ChangeOptions {
            mode: effective_mode(args.mode),
            force: false,
            dry_run: args.dry_run,
        },
    )?;

    print_report(&context.output, &report);
    Ok(())
}
