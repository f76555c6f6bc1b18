//! # Rendering
//!
//! The engine treats rendering as an external collaborator behind the
//! [`Renderer`] trait: `render(template, variables) -> text`. The default
//! [`VariableRenderer`] substitutes `${name}` placeholders and fails on any
//! placeholder without a value.
//!
//! On top of the trait, this module turns a snapshot plus an enabled set into
//! per-unit file trees. A component's tree is its base directory with the
//! selected variant's overlay merged over it (last write wins). Non-UTF-8
//! files are copied as they are.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{ComponentRef, UnitRef};
use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::snapshot::TemplateSnapshot;

/// Render context: variable name to value.
pub type Variables = BTreeMap<String, String>;

/// Turns template text into file content.
pub trait Renderer {
    fn render(&self, template: &str, variables: &Variables) -> Result<String>;
}

/// `${name}` substitution. `$${` produces a literal `${`.
#[derive(Debug, Clone)]
pub struct VariableRenderer {
    pattern: Regex,
}

impl VariableRenderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"\$(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}")?,
        })
    }
}

impl Renderer for VariableRenderer {
    fn render(&self, template: &str, variables: &Variables) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;

        for captures in self.pattern.captures_iter(template) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            last = whole.end();

            let name = &captures[2];
            if !captures[1].is_empty() {
                output.push_str("${");
                output.push_str(name);
                output.push('}');
                continue;
            }
            match variables.get(name) {
                Some(value) => output.push_str(value),
                None => {
                    return Err(Error::Template {
                        message: "undefined variable".to_string(),
                        variable: Some(name.to_string()),
                    })
                }
            }
        }
        output.push_str(&template[last..]);
        Ok(output)
    }
}

/// Render every UTF-8 file of a tree.
pub fn render_tree(
    renderer: &dyn Renderer,
    files: &MemoryFS,
    variables: &Variables,
) -> Result<MemoryFS> {
    let mut rendered = MemoryFS::new();
    for (path, file) in files.files() {
        let file = match file.as_str() {
            Some(text) => {
                let content = renderer.render(text, variables).map_err(|e| match e {
                    Error::Template { message, variable } => Error::Template {
                        message: format!("{} in {}", message, path.display()),
                        variable,
                    },
                    other => other,
                })?;
                File {
                    content: content.into_bytes(),
                    permissions: file.permissions,
                }
            }
            None => file.clone(),
        };
        rendered.add_file(path, file)?;
    }
    Ok(rendered)
}

/// Rendered files of one unit.
pub fn render_unit(
    renderer: &dyn Renderer,
    snapshot: &TemplateSnapshot,
    unit: &UnitRef,
    variables: &Variables,
) -> Result<MemoryFS> {
    let files = match unit {
        UnitRef::Component(r) => snapshot.component_files(&r.name, r.variant.as_deref()),
        UnitRef::Service(name) => snapshot.service_files(name),
    };
    render_tree(renderer, &files, variables)
}

/// Rendered files of every unit in an enabled set, keyed by unit.
pub fn render_units(
    renderer: &dyn Renderer,
    snapshot: &TemplateSnapshot,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    variables: &Variables,
) -> Result<BTreeMap<UnitRef, MemoryFS>> {
    let units = components
        .iter()
        .map(|(name, variant)| {
            UnitRef::Component(ComponentRef {
                name: name.clone(),
                variant: variant.clone(),
            })
        })
        .chain(services.iter().cloned().map(UnitRef::Service));

    let mut rendered = BTreeMap::new();
    for unit in units {
        let files = render_unit(renderer, snapshot, &unit, variables)?;
        rendered.insert(unit, files);
    }
    Ok(rendered)
}
