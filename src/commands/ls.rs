//! # Ls Command Implementation
//!
//! This module implements the `ls` subcommand, which lists the components,
//! services and shared files a template offers.
//!
//! ## Functionality
//!
//! - **Catalog Listing**: variants, dependencies and conflicts of every
//!   component, and the requirements of every service
//! - **Enabled Units**: inside a project, enabled units are marked
//! - **Dependency Tree**: `--tree` prints what each unit pulls in
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;

use project_kit::catalog::{Catalog, Component};
use project_kit::manifest::ProjectManifest;
use project_kit::output::emoji;
use project_kit::source::{self, TemplateSource};
use project_kit::suggestions;

use super::Context;

/// List the components and services a template offers
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Template directory or git URL (default: the project's template)
    #[arg(short, long, value_name = "SOURCE", env = "PROJECT_KIT_SOURCE")]
    pub source: Option<String>,

    /// Template revision (default: the project's revision, else the latest)
    #[arg(short, long, value_name = "REV")]
    pub revision: Option<String>,

    /// Show the dependency tree of every component and service
    #[arg(long)]
    pub tree: bool,
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs, context: &Context) -> Result<()> {
    let manifest = if ProjectManifest::exists(&context.project) {
        Some(ProjectManifest::load(&context.project)?)
    } else {
        None
    };

    let (template, revision): (Box<dyn TemplateSource>, Option<String>) =
        match (&args.source, &manifest) {
            (Some(spec), _) => (
                source::open(spec, &std::env::current_dir()?, &context.cache_root),
                args.revision.clone(),
            ),
            (None, Some(manifest)) => (
                source::open(
                    &manifest.template_source,
                    &context.project,
                    &context.cache_root,
                ),
                args.revision
                    .clone()
                    .or_else(|| Some(manifest.template_revision.clone())),
            ),
            (None, None) => return Err(suggestions::source_not_configured()),
        };

    let snapshot = template.fetch(revision.as_deref())?;
    let enabled = |name: &str| {
        manifest.as_ref().is_some_and(|m| {
            m.enabled_components.contains_key(name) || m.enabled_services.contains(name)
        })
    };

    println!(
        "{} {} @ {}",
        emoji(&context.output, "📦", "[TEMPLATE]"),
        template.describe(),
        snapshot.revision
    );

    if args.tree {
        let root = build_tree(&snapshot.catalog);
        print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
        return Ok(());
    }

    println!("\nComponents:");
    for component in snapshot.catalog.components() {
        println!(
            "  {} {}{}",
            if enabled(&component.name) { "*" } else { " " },
            component.name,
            describe_component(component)
        );
        if !component.description.is_empty() {
            println!("        {}", component.description);
        }
    }

    let services: Vec<_> = snapshot.catalog.services().collect();
    if !services.is_empty() {
        println!("\nServices:");
        for service in services {
            let requires: Vec<String> = service.requires.iter().map(|r| r.to_string()).collect();
            println!(
                "  {} {}{}",
                if enabled(&service.name) { "*" } else { " " },
                service.name,
                if requires.is_empty() {
                    String::new()
                } else {
                    format!(" (requires {})", requires.join(", "))
                }
            );
        }
    }

    let shared: Vec<_> = snapshot.catalog.shared_files().collect();
    if !shared.is_empty() {
        println!("\nShared files:");
        for file in shared {
            println!("    {} ({:?})", file.path, file.format);
        }
    }
    Ok(())
}

fn describe_component(component: &Component) -> String {
    let mut parts = Vec::new();
    if !component.variants.is_empty() {
        let default = component.resolve_variant(None).ok().flatten();
        let variants: Vec<String> = component
            .variants
            .iter()
            .map(|v| {
                if Some(v) == default.as_ref() {
                    format!("{} (default)", v)
                } else {
                    v.clone()
                }
            })
            .collect();
        parts.push(format!("variants: {}", variants.join(", ")));
    }
    if !component.dependencies.is_empty() {
        let deps: Vec<String> = component.dependencies.iter().map(|d| d.to_string()).collect();
        parts.push(format!("needs: {}", deps.join(", ")));
    }
    if !component.conflicts.is_empty() {
        let conflicts: Vec<String> = component.conflicts.iter().map(|c| c.to_string()).collect();
        parts.push(format!("conflicts: {}", conflicts.join(", ")));
    }
    if !component.removable {
        parts.push("core".to_string());
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join("; "))
    }
}

fn build_tree(catalog: &Catalog) -> TreeNode {
    let mut children: Vec<TreeNode> = catalog
        .components()
        .map(|c| component_node(catalog, &c.name, &c.name))
        .collect();
    children.extend(catalog.services().map(|service| TreeNode {
        label: format!("{} (service)", service.name),
        children: service
            .requires
            .iter()
            .map(|r| component_node(catalog, &r.name, &r.to_string()))
            .collect(),
    }));
    TreeNode {
        label: "catalog".to_string(),
        children,
    }
}

/// The catalog is acyclic, so the recursion ends.
fn component_node(catalog: &Catalog, name: &str, label: &str) -> TreeNode {
    let children = catalog
        .component(name)
        .map(|c| {
            c.dependencies
                .iter()
                .map(|d| component_node(catalog, &d.name, &d.to_string()))
                .collect()
        })
        .unwrap_or_default();
    TreeNode {
        label: label.to_string(),
        children,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::from(&self.children[..])
    }
}
