//! # CLI Command Implementations
//!
//! Each subcommand of `project-kit` lives in its own file and contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` plus the global
//!   [`Context`] and calls into the `project_kit` library.
//!
//! The helpers below are shared by the mutating commands: choosing the
//! resolution mode, confirming auto-added dependencies and printing reports.

pub mod add;
pub mod completions;
pub mod init;
pub mod ls;
pub mod remove;
pub mod status;
pub mod update;

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::PathBuf;

use project_kit::manifest::ProjectManifest;
use project_kit::orchestrator::{CommandReport, PreparedChange};
use project_kit::output::{emoji, format_operation, OutputConfig};
use project_kit::resolver::Mode;
use project_kit::suggestions;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub project: PathBuf,
    pub cache_root: PathBuf,
    pub output: OutputConfig,
}

impl Context {
    /// Fail with a hint unless the project directory holds a manifest.
    pub fn ensure_project(&self) -> Result<()> {
        if ProjectManifest::exists(&self.project) {
            Ok(())
        } else {
            Err(suggestions::manifest_not_found(&ProjectManifest::path(
                &self.project,
            )))
        }
    }
}

fn interactive() -> bool {
    console::Term::stdout().is_term() && console::Term::stderr().is_term()
}

/// Auto mode on a terminal, strict mode otherwise.
pub fn effective_mode(requested: Option<Mode>) -> Mode {
    requested.unwrap_or(if interactive() { Mode::Auto } else { Mode::Strict })
}

/// Ask before enabling dependencies nobody requested.
///
/// Returns `true` when the change may proceed.
pub fn confirm_implied(change: &PreparedChange, yes: bool) -> Result<bool> {
    let implied = &change.resolution.implied;
    if implied.is_empty() || yes || !interactive() {
        return Ok(true);
    }

    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Also enable required component(s) {}?",
            implied.join(", ")
        ))
        .default(true)
        .interact()?;
    Ok(proceed)
}

/// Print warnings, implied units and the operations of a report.
pub fn print_report(output: &OutputConfig, report: &CommandReport) {
    for warning in &report.resolution.warnings {
        eprintln!("  {} {}", emoji(output, "⚠️ ", "[WARN]"), warning);
    }
    if !report.resolution.implied.is_empty() {
        println!(
            "{} Enabled as dependencies: {}",
            emoji(output, "🔗", "[DEPS]"),
            report.resolution.implied.join(", ")
        );
    }

    if report.operations.is_empty() {
        println!("{} Nothing to do", emoji(output, "✅", "[OK]"));
        return;
    }

    if report.dry_run {
        println!(
            "{} Dry run: {} operation(s) would be performed",
            emoji(output, "🔍", "[DRY-RUN]"),
            report.operations.len()
        );
    }
    for operation in &report.operations {
        println!("{}", format_operation(output, operation));
    }
    if !report.dry_run {
        println!(
            "{} {} operation(s) applied",
            emoji(output, "✅", "[OK]"),
            report.operations.len()
        );
    }
}
