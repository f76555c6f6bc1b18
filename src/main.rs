//! # Project Kit CLI
//!
//! This is the binary entry point for the `project-kit` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating errors into user-friendly output and the documented exit
//!   codes.
//!
//! The core application logic is defined in the `lib.rs` library crate, so
//! the binary stays a thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;

use project_kit::error::Error;
use project_kit::exit_codes;
use project_kit::suggestions;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(err) = cli.execute() {
        eprintln!("Error: {:#}", err);
        let code = match err.downcast_ref::<Error>() {
            Some(error) => {
                for hint in suggestions::resolution_hints(error) {
                    eprintln!("{}", hint);
                }
                error.exit_code()
            }
            None => exit_codes::ERROR,
        };
        std::process::exit(code);
    }
}
