//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which moves a project to a
//! newer template revision through a three-way comparison of the template at
//! the project's revision (base), the project on disk, and the template at
//! the target revision.
//!
//! ## Functionality
//!
//! - **Automatic Updates**: files the user never touched follow the template
//! - **Local Edits**: files only the user changed are kept
//! - **Conflicts**: files changed on both sides are listed with all three
//!   versions and left alone; the project stays at its revision and the
//!   command exits with code 5
//! - **Force**: `--force` applies the non-conflicting updates anyway; the
//!   revision still does not advance
//! - **Dry Run**: `--dry-run` shows the outcome without touching the disk

use anyhow::Result;
use clap::Args;

use project_kit::engine::reconcile::{Conflict, Outcome};
use project_kit::orchestrator::{Session, UpdateOptions, UpdateReport};
use project_kit::output::{emoji, format_operation, OutputConfig};
use project_kit::path::display_path;

use super::Context;

/// Lines of each side shown for a conflict.
const PREVIEW_LINES: usize = 5;

/// Move the project to a newer template revision
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Target revision (default: latest)
    #[arg(long, value_name = "REV")]
    pub to: Option<String>,

    /// Show the outcome without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Apply non-conflicting changes even when conflicts exist
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, context: &Context) -> Result<()> {
    context.ensure_project()?;
    let session = Session::for_project(&context.project, &context.cache_root)?;

    let report = session.update(&UpdateOptions {
        to_revision: args.to,
        dry_run: args.dry_run,
        force: args.force,
    })?;

    print_update(&context.output, &report);
    report.into_result()?;
    Ok(())
}

fn print_update(output: &OutputConfig, report: &UpdateReport) {
    for warning in &report.warnings {
        eprintln!("  {} {}", emoji(output, "⚠️ ", "[WARN]"), warning);
    }
    if report.from == report.to {
        println!(
            "{} Already at {}",
            emoji(output, "✅", "[OK]"),
            report.to
        );
        return;
    }

    println!(
        "{} {} -> {}{}",
        emoji(output, "🔄", "[UPDATE]"),
        report.from,
        report.to,
        if report.dry_run { " (dry run)" } else { "" }
    );

    let kept: Vec<String> = report
        .entries
        .iter()
        .filter(|e| e.outcome == Outcome::KeptLocal)
        .map(|e| display_path(&e.path))
        .collect();
    if !kept.is_empty() {
        println!("  Kept local changes: {}", kept.join(", "));
    }

    for operation in &report.operations {
        println!("{}", format_operation(output, operation));
    }

    for conflict in &report.conflicts {
        print_conflict(output, conflict);
    }

    if report.advanced {
        println!(
            "{} Project is now at {}",
            emoji(output, "✅", "[OK]"),
            report.to
        );
    } else if !report.conflicts.is_empty() && !report.dry_run {
        println!(
            "{} Project stays at {}; resolve the conflicts and run update again",
            emoji(output, "⛔", "[BLOCKED]"),
            report.from
        );
    }
}

fn print_conflict(output: &OutputConfig, conflict: &Conflict) {
    println!(
        "{} {} ({})",
        emoji(output, "❌", "[CONFLICT]"),
        display_path(&conflict.path),
        conflict.kind
    );
    for (label, content) in [
        ("base", &conflict.base),
        ("project", &conflict.project),
        ("target", &conflict.target),
    ] {
        println!("    --- {}", label);
        match content {
            None => println!("    (absent)"),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => {
                    for line in text.lines().take(PREVIEW_LINES) {
                        println!("    {}", line);
                    }
                    if text.lines().count() > PREVIEW_LINES {
                        println!("    ...");
                    }
                }
                Err(_) => println!("    ({} bytes of binary content)", bytes.len()),
            },
        }
    }
}
