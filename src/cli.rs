//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, Context};
use project_kit::output::{ColorChoice, OutputConfig};

/// Project Kit - Add, remove and update components of a generated project
#[derive(Parser, Debug)]
#[command(name = "project-kit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output
    #[arg(
        long,
        global = true,
        value_name = "WHEN",
        value_enum,
        default_value_t = ColorChoice::Auto
    )]
    color: ColorChoice,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Project directory to operate on
    #[arg(
        short = 'C',
        long = "project",
        global = true,
        value_name = "DIR",
        default_value = "."
    )]
    project: PathBuf,

    /// The root directory for cached template clones.
    ///
    /// Defaults to the system cache directory (`~/.cache/project-kit` on
    /// Linux, `~/Library/Caches/project-kit` on macOS).
    #[arg(long, global = true, value_name = "DIR", env = "PROJECT_KIT_CACHE")]
    cache_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new project from a template
    Init(commands::init::InitArgs),

    /// Enable components or services
    Add(commands::add::AddArgs),

    /// Disable components or services and delete the files they own
    Remove(commands::remove::RemoveArgs),

    /// Move the project to a newer template revision
    Update(commands::update::UpdateArgs),

    /// List the components and services a template offers
    Ls(commands::ls::LsArgs),

    /// Show the project state and local drift
    Status(commands::status::StatusArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let context = Context {
            project: self.project,
            cache_root: self
                .cache_root
                .unwrap_or_else(project_kit::defaults::default_cache_root),
            output: OutputConfig::new(self.color),
        };

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &context),
            Commands::Add(args) => commands::add::execute(args, &context),
            Commands::Remove(args) => commands::remove::execute(args, &context),
            Commands::Update(args) => commands::update::execute(args, &context),
            Commands::Ls(args) => commands::ls::execute(args, &context),
            Commands::Status(args) => commands::status::execute(args, &context),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
