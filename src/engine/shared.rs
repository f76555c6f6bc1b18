//! Regenerating shared files from the enabled set.
//!
//! Shared files are never patched in place. Each one is derived again from
//! its header and the fragments of every enabled unit: components in catalog
//! order (variant fragments after plain ones), then services by name. The
//! manifest keeps the digest of the content last written, which tells an
//! engine-generated file apart from one the user edited.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::apply::decide;
use super::{read_existing, stage, FileOperation, OperationKind, OperationSource, Plan};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::filesystem::{content_digest, File};
use crate::merge::{merge_fragments, Fragment};
use crate::render::{Renderer, Variables};

/// Content of every shared file for an enabled set. `None` marks a file with
/// neither header nor contributor.
pub fn render_shared(
    catalog: &Catalog,
    renderer: &dyn Renderer,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    variables: &Variables,
) -> Result<BTreeMap<String, Option<String>>> {
    let mut fragments: BTreeMap<&str, Vec<Fragment>> = BTreeMap::new();

    for component in catalog.components() {
        let Some(variant) = components.get(&component.name) else {
            continue;
        };
        for (path, text) in component.fragments_for(variant.as_deref()) {
            fragments.entry(path).or_default().push(Fragment {
                origin: component.name.clone(),
                text: renderer.render(text, variables)?,
            });
        }
    }
    for service in catalog.services() {
        if !services.contains(&service.name) {
            continue;
        }
        for (path, text) in &service.fragments {
            fragments.entry(path.as_str()).or_default().push(Fragment {
                origin: service.name.clone(),
                text: renderer.render(text, variables)?,
            });
        }
    }

    let mut rendered = BTreeMap::new();
    for shared in catalog.shared_files() {
        let header = match &shared.header {
            Some(header) => Some(renderer.render(header, variables)?),
            None => None,
        };
        let contributions = fragments
            .get(shared.path.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let content = merge_fragments(shared.format, &shared.path, header.as_deref(), contributions)?;
        rendered.insert(shared.path.clone(), content);
    }
    Ok(rendered)
}

/// Planned shared-file changes plus the digests to record once committed.
#[derive(Debug, Clone, Default)]
pub struct SharedPlan {
    pub plan: Plan,
    /// Shared file path to the digest of its content after the commit.
    pub digests: BTreeMap<String, String>,
}

/// Plan bringing every shared file in line with the enabled set.
///
/// `recorded` holds the digests stored in the manifest.
#[allow(clippy::too_many_arguments)]
pub fn plan_regenerate(
    root: &Path,
    catalog: &Catalog,
    renderer: &dyn Renderer,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    variables: &Variables,
    recorded: &BTreeMap<String, String>,
    force: bool,
) -> Result<SharedPlan> {
    let rendered = render_shared(catalog, renderer, components, services, variables)?;
    let mut result = SharedPlan::default();

    for (path, content) in rendered {
        let relative = PathBuf::from(&path);
        let existing = read_existing(root, &relative)?;
        let recorded_digest = recorded.get(&path);
        let engine_generated = match (&existing, recorded_digest) {
            (Some(current), Some(digest)) => &content_digest(current) == digest,
            _ => false,
        };

        let Some(content) = content else {
            if existing.is_some() {
                if engine_generated {
                    result.plan.record(
                        relative,
                        OperationKind::Delete,
                        OperationSource::SharedRegenerated,
                    );
                } else {
                    log::warn!(
                        "{} no longer has contributors but was edited; leaving it in place",
                        path
                    );
                }
            }
            continue;
        };

        let digest = content_digest(content.as_bytes());
        match decide(existing.as_deref(), content.as_bytes(), engine_generated, force) {
            None => {
                result.digests.insert(path, digest);
            }
            Some(OperationKind::SkipExisting) => {
                log::warn!(
                    "{} was edited by hand; not regenerating it (use --force to overwrite with a backup)",
                    path
                );
                result.plan.record(
                    relative,
                    OperationKind::SkipExisting,
                    OperationSource::SharedRegenerated,
                );
                if let Some(previous) = recorded_digest {
                    result.digests.insert(path, previous.clone());
                }
            }
            Some(kind) => {
                result.plan.write(
                    relative,
                    kind,
                    OperationSource::SharedRegenerated,
                    File::from_string(&content),
                );
                result.digests.insert(path, digest);
            }
        }
    }

    Ok(result)
}

/// Plan and commit shared-file regeneration, returning the operations and
/// the digests to store.
#[allow(clippy::too_many_arguments)]
pub fn regenerate(
    root: &Path,
    catalog: &Catalog,
    renderer: &dyn Renderer,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    variables: &Variables,
    recorded: &BTreeMap<String, String>,
    force: bool,
) -> Result<(Vec<FileOperation>, BTreeMap<String, String>)> {
    let shared = plan_regenerate(
        root, catalog, renderer, components, services, variables, recorded, force,
    )?;
    let operations = stage::commit(root, &shared.plan)?;
    Ok((operations, shared.digests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::VariableRenderer;
    use crate::test_support::{read, sample_catalog};
    use std::fs;
    use tempfile::TempDir;

    fn vars() -> Variables {
        Variables::from([("project_name".to_string(), "demo".to_string())])
    }

    fn enabled(components: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        components
            .iter()
            .map(|(name, variant)| (name.to_string(), variant.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_render_shared_orders_fragments() {
        let renderer = VariableRenderer::new().unwrap();
        let shared = render_shared(
            &sample_catalog(),
            &renderer,
            &enabled(&[("core", None), ("database", Some("postgres")), ("redis", None)]),
            &BTreeSet::from(["auth".to_string()]),
            &vars(),
        )
        .unwrap();

        insta::assert_snapshot!(
            shared["requirements.txt"].as_deref().unwrap(),
            @r"
        # dependencies for demo
        fastapi
        sqlalchemy
        psycopg
        redis
        passlib
        "
        );
    }

    #[test]
    fn test_render_shared_yaml_merges_services() {
        let renderer = VariableRenderer::new().unwrap();
        let shared = render_shared(
            &sample_catalog(),
            &renderer,
            &enabled(&[("core", None), ("database", Some("postgres"))]),
            &BTreeSet::new(),
            &vars(),
        )
        .unwrap();

        let compose: serde_yaml::Value =
            serde_yaml::from_str(shared["docker-compose.yml"].as_deref().unwrap()).unwrap();
        assert_eq!(compose["services"]["app"]["build"], ".");
        assert_eq!(compose["services"]["db"]["image"], "postgres:16");
    }

    #[test]
    fn test_regenerate_creates_and_records_digests() {
        let temp = TempDir::new().unwrap();
        let renderer = VariableRenderer::new().unwrap();

        let (ops, digests) = regenerate(
            temp.path(),
            &sample_catalog(),
            &renderer,
            &enabled(&[("core", None)]),
            &BTreeSet::new(),
            &vars(),
            &BTreeMap::new(),
            false,
        )
        .unwrap();

        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.kind == OperationKind::Create));
        let requirements = read(temp.path(), "requirements.txt");
        assert_eq!(
            digests["requirements.txt"],
            content_digest(requirements.as_bytes())
        );
    }

    #[test]
    fn test_regenerate_overwrites_engine_generated_content() {
        let temp = TempDir::new().unwrap();
        let renderer = VariableRenderer::new().unwrap();
        let catalog = sample_catalog();

        let (_, digests) = regenerate(
            temp.path(),
            &catalog,
            &renderer,
            &enabled(&[("core", None)]),
            &BTreeSet::new(),
            &vars(),
            &BTreeMap::new(),
            false,
        )
        .unwrap();

        let shared = plan_regenerate(
            temp.path(),
            &catalog,
            &renderer,
            &enabled(&[("core", None), ("redis", None)]),
            &BTreeSet::new(),
            &vars(),
            &digests,
            false,
        )
        .unwrap();
        let ops = shared.plan.operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path, PathBuf::from("requirements.txt"));
        assert_eq!(ops[0].kind, OperationKind::Overwrite);
    }

    #[test]
    fn test_regenerate_skips_user_edits_and_keeps_digest() {
        let temp = TempDir::new().unwrap();
        let renderer = VariableRenderer::new().unwrap();
        let catalog = sample_catalog();
        fs::write(temp.path().join("requirements.txt"), "pinned==1.0\n").unwrap();
        let recorded = BTreeMap::from([("requirements.txt".to_string(), "stale".to_string())]);

        let shared = plan_regenerate(
            temp.path(),
            &catalog,
            &renderer,
            &enabled(&[("core", None)]),
            &BTreeSet::new(),
            &vars(),
            &recorded,
            false,
        )
        .unwrap();

        let skipped: Vec<_> = shared
            .plan
            .operations()
            .into_iter()
            .filter(|op| op.kind == OperationKind::SkipExisting)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(shared.digests["requirements.txt"], "stale");
        assert_eq!(read(temp.path(), "requirements.txt"), "pinned==1.0\n");
    }

    #[test]
    fn test_file_without_contributors_is_deleted_when_unchanged() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::parse(
            r#"
shared_files:
  - path: .env
components:
  - name: core
  - name: redis
    fragments:
      .env: "REDIS_URL=redis://\n"
"#,
        )
        .unwrap();
        let renderer = VariableRenderer::new().unwrap();

        let (_, digests) = regenerate(
            temp.path(),
            &catalog,
            &renderer,
            &enabled(&[("core", None), ("redis", None)]),
            &BTreeSet::new(),
            &vars(),
            &BTreeMap::new(),
            false,
        )
        .unwrap();
        assert!(temp.path().join(".env").exists());

        let (ops, digests) = regenerate(
            temp.path(),
            &catalog,
            &renderer,
            &enabled(&[("core", None)]),
            &BTreeSet::new(),
            &vars(),
            &digests,
            false,
        )
        .unwrap();
        assert_eq!(ops[0].kind, OperationKind::Delete);
        assert!(digests.is_empty());
        assert!(!temp.path().join(".env").exists());
    }
}
