//! # Output Configuration
//!
//! Report rendering for the CLI: whether to color, the emoji-or-plain markers
//! and the per-operation lines printed after a command.
//!
//! `--color auto` honours `NO_COLOR`, `CLICOLOR=0`, `CLICOLOR_FORCE` and
//! `TERM=dumb` before asking the terminal. Without color, markers fall back
//! to bracketed text (`[OK]`, `[CONFLICT]`) so scripts can grep for them.

use console::Style;

use crate::engine::{FileOperation, OperationKind};
use crate::path::display_path;

/// Value of the global `--color` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    Always,
    Never,
    #[default]
    Auto,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    pub fn new(choice: ColorChoice) -> Self {
        let use_color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => color_from_env(|name| {
                std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| console::Term::stdout().features().colors_supported()),
        };
        Self { use_color }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

/// The color decision the environment forces, if any. `NO_COLOR` wins even
/// when empty.
fn color_from_env(var: impl Fn(&str) -> Option<String>) -> Option<bool> {
    if var("NO_COLOR").is_some() || var("CLICOLOR").as_deref() == Some("0") {
        return Some(false);
    }
    if var("CLICOLOR_FORCE").is_some_and(|v| !v.is_empty() && v != "0") {
        return Some(true);
    }
    if var("TERM").as_deref() == Some("dumb") {
        return Some(false);
    }
    None
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// An operation kind, padded for column alignment and colored by effect.
pub fn styled_kind(config: &OutputConfig, kind: OperationKind) -> String {
    let label = format!("{:<20}", kind.as_str());
    if !config.use_color {
        return label;
    }
    let style = match kind {
        OperationKind::Create => Style::new().green(),
        OperationKind::Overwrite => Style::new().cyan(),
        OperationKind::SkipExisting => Style::new().yellow(),
        OperationKind::BackupAndOverwrite => Style::new().magenta(),
        OperationKind::Delete | OperationKind::DeleteIfEmptyDir => Style::new().red(),
    };
    style.apply_to(label).force_styling(true).to_string()
}

/// One report line for an operation: `<kind> <path>`.
pub fn format_operation(config: &OutputConfig, operation: &FileOperation) -> String {
    format!(
        "  {} {}",
        styled_kind(config, operation.kind),
        display_path(&operation.path)
    )
}
