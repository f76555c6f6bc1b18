//! # Completions Command Implementation
//!
//! Prints a shell completion script for `project-kit`.
//!
//! ```bash
//! project-kit completions bash > ~/.local/share/bash-completion/completions/project-kit
//! project-kit completions zsh > ~/.zfunc/_project-kit
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io::Write;

use crate::cli::Cli;

const BIN_NAME: &str = "project-kit";

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for (bash, zsh, fish, powershell, elvish)
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for a shell to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut std::io::stdout());
    Ok(())
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut Cli::command(), BIN_NAME, out);
}
