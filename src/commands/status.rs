//! # Status Command Implementation
//!
//! Shows the manifest of a project (template, revision, enabled units) and
//! which generated files were changed or deleted locally. Read-only.

use anyhow::Result;
use clap::Args;

use project_kit::manifest::EngineKind;
use project_kit::orchestrator::Session;
use project_kit::output::emoji;
use project_kit::path::display_path;

use super::Context;

/// Show the project state and local drift
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only print the manifest summary, skip comparing files
    #[arg(long)]
    pub short: bool,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, context: &Context) -> Result<()> {
    context.ensure_project()?;
    let session = Session::for_project(&context.project, &context.cache_root)?;
    let output = &context.output;

    let manifest = if args.short {
        project_kit::manifest::ProjectManifest::load(&context.project)?
    } else {
        let status = session.status()?;
        if status.modified.is_empty() && status.missing.is_empty() {
            println!(
                "{} Generated files match the template",
                emoji(output, "✅", "[OK]")
            );
        }
        for path in &status.modified {
            println!("  modified  {}", display_path(path));
        }
        for path in &status.missing {
            println!("  missing   {}", display_path(path));
        }
        status.manifest
    };

    println!("Template:   {}", session.source().describe());
    println!("Revision:   {}", manifest.template_revision);
    if manifest.engine_kind == EngineKind::Frozen {
        println!("Mode:       frozen");
    }
    let components: Vec<String> = manifest
        .enabled_components
        .iter()
        .map(|(name, variant)| match variant {
            Some(variant) => format!("{}:{}", name, variant),
            None => name.clone(),
        })
        .collect();
    println!("Components: {}", components.join(", "));
    if !manifest.enabled_services.is_empty() {
        let services: Vec<&str> = manifest
            .enabled_services
            .iter()
            .map(String::as_str)
            .collect();
        println!("Services:   {}", services.join(", "));
    }
    Ok(())
}
