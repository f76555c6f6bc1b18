//! # Component Catalog
//!
//! The catalog is the static registry of everything a template can contribute
//! to a project: **components** (infrastructure units such as a database or a
//! scheduler), **services** (business units that require components) and
//! **shared files** (files whose content depends on the whole enabled set).
//!
//! It is loaded from the `kit.yaml` file at the root of a template snapshot:
//!
//! ```yaml
//! shared_files:
//!   - path: requirements.txt
//!     format: lines
//! components:
//!   - name: database
//!     variants: [postgres, sqlite]
//!     default_variant: postgres
//!     dependencies: [core]
//!     owned_paths: ["app/db/**"]
//!     data_paths: ["data/**"]
//!     fragments:
//!       requirements.txt: "sqlalchemy\n"
//! services:
//!   - name: auth
//!     requires: [database]
//! ```
//!
//! Catalog records are plain immutable data in `BTreeMap`s keyed by name.
//! Loading validates the whole table up front (unknown references, name
//! collisions, shared ownership, dependency cycles) so the resolver and the
//! merge engine never have to handle a malformed catalog. A deterministic
//! topological order over components (dependencies first, ties broken by
//! name) is computed once and reused by every consumer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::suggestions::find_similar;

/// Reference to a component, optionally pinning one of its variants.
///
/// Written as `name` or `name:variant` in the catalog and on the command line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentRef {
    pub name: String,
    pub variant: Option<String>,
}

impl ComponentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: None,
        }
    }

    pub fn with_variant(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: Some(variant.into()),
        }
    }
}

impl FromStr for ComponentRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::Catalog {
            message: format!("invalid reference '{}'", s),
            hint: Some("use 'name' or 'name:variant'".to_string()),
        };

        match s.split_once(':') {
            None if !s.is_empty() => Ok(ComponentRef::new(s)),
            Some((name, variant))
                if !name.is_empty() && !variant.is_empty() && !variant.contains(':') =>
            {
                Ok(ComponentRef::with_variant(name, variant))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for ComponentRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ComponentRef> for String {
    fn from(value: ComponentRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}:{}", self.name, variant),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A requested catalog entry: a component or a service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitRef {
    Component(ComponentRef),
    Service(String),
}

impl UnitRef {
    pub fn name(&self) -> &str {
        match self {
            UnitRef::Component(r) => &r.name,
            UnitRef::Service(name) => name,
        }
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Component(r) => write!(f, "{}", r),
            UnitRef::Service(name) => write!(f, "{}", name),
        }
    }
}

fn default_true() -> bool {
    true
}

/// An infrastructure unit contributing owned files to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Allowed variants. Empty when the component takes no variant.
    #[serde(default)]
    pub variants: Vec<String>,
    /// Variant used when none is requested. Defaults to the first variant.
    #[serde(default)]
    pub default_variant: Option<String>,
    /// Hard requirements, enabled automatically in auto mode.
    #[serde(default)]
    pub dependencies: Vec<ComponentRef>,
    /// Components that cannot be enabled together with this one.
    #[serde(default)]
    pub conflicts: Vec<ComponentRef>,
    /// Glob patterns of the files this component exclusively contributes.
    #[serde(default)]
    pub owned_paths: Vec<String>,
    /// Glob patterns of data the component uses but does not own. Never
    /// deleted on removal.
    #[serde(default)]
    pub data_paths: Vec<String>,
    /// Core components cannot be removed.
    #[serde(default = "default_true")]
    pub removable: bool,
    /// Contribution to shared files, keyed by shared file path.
    #[serde(default)]
    pub fragments: BTreeMap<String, String>,
    /// Variant-specific contribution to shared files.
    #[serde(default)]
    pub variant_fragments: BTreeMap<String, BTreeMap<String, String>>,
}

impl Component {
    /// Pick the variant to enable for a request.
    pub fn resolve_variant(&self, requested: Option<&str>) -> Result<Option<String>> {
        match requested {
            Some(variant) if self.variants.iter().any(|v| v == variant) => {
                Ok(Some(variant.to_string()))
            }
            Some(variant) => Err(Error::Catalog {
                message: format!("component '{}' has no variant '{}'", self.name, variant),
                hint: Some(if self.variants.is_empty() {
                    format!("'{}' does not take a variant", self.name)
                } else {
                    format!("available variants: {}", self.variants.join(", "))
                }),
            }),
            None => Ok(self
                .default_variant
                .clone()
                .or_else(|| self.variants.first().cloned())),
        }
    }

    /// Shared-file fragments for the given variant: plain fragments first,
    /// then the variant-specific ones.
    pub fn fragments_for(&self, variant: Option<&str>) -> Vec<(&str, &str)> {
        let mut fragments: Vec<(&str, &str)> = self
            .fragments
            .iter()
            .map(|(path, text)| (path.as_str(), text.as_str()))
            .collect();
        if let Some(specific) = variant.and_then(|v| self.variant_fragments.get(v)) {
            fragments.extend(specific.iter().map(|(path, text)| (path.as_str(), text.as_str())));
        }
        fragments
    }
}

/// A business unit that requires components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Components that must be enabled. Auto-added only in auto mode.
    #[serde(default)]
    pub requires: Vec<ComponentRef>,
    #[serde(default)]
    pub owned_paths: Vec<String>,
    #[serde(default)]
    pub fragments: BTreeMap<String, String>,
}

/// How fragments of a shared file are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedFormat {
    /// Line list; duplicate non-blank lines are dropped.
    #[default]
    Lines,
    Yaml,
    Json,
    Toml,
}

/// A file derived from the whole enabled set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedFile {
    pub path: String,
    #[serde(default)]
    pub format: SharedFormat,
    /// Leading text, rendered with the project variables.
    #[serde(default)]
    pub header: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    components: Vec<Component>,
    #[serde(default)]
    services: Vec<Service>,
    #[serde(default)]
    shared_files: Vec<SharedFile>,
}

/// Validated registry of components, services and shared files.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    components: BTreeMap<String, Component>,
    services: BTreeMap<String, Service>,
    shared_files: BTreeMap<String, SharedFile>,
    order: Vec<String>,
}

impl Catalog {
    /// Parse and validate a catalog document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(yaml).map_err(|e| Error::Catalog {
            message: format!("invalid catalog document: {}", e),
            hint: None,
        })?;
        Self::from_parts(document.components, document.services, document.shared_files)
    }

    /// Load a catalog from a `kit.yaml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Catalog {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: None,
        })?;
        Self::parse(&content)
    }

    /// Build a catalog from records, validating them.
    pub fn from_parts(
        components: Vec<Component>,
        services: Vec<Service>,
        shared_files: Vec<SharedFile>,
    ) -> Result<Self> {
        let mut catalog = Catalog::default();

        for component in components {
            if catalog.components.contains_key(&component.name) {
                return Err(Error::catalog(format!(
                    "component '{}' is declared twice",
                    component.name
                )));
            }
            catalog.components.insert(component.name.clone(), component);
        }
        for service in services {
            if catalog.components.contains_key(&service.name)
                || catalog.services.contains_key(&service.name)
            {
                return Err(Error::catalog(format!(
                    "name '{}' is declared more than once",
                    service.name
                )));
            }
            catalog.services.insert(service.name.clone(), service);
        }
        for shared in shared_files {
            crate::path::validate_relative(Path::new(&shared.path)).map_err(|e| {
                Error::catalog(format!("shared file '{}': {}", shared.path, e))
            })?;
            if catalog.shared_files.contains_key(&shared.path) {
                return Err(Error::catalog(format!(
                    "shared file '{}' is declared twice",
                    shared.path
                )));
            }
            catalog.shared_files.insert(shared.path.clone(), shared);
        }

        catalog.validate()?;
        catalog.order = catalog.topological_order()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();

        for component in self.components.values() {
            if component.name.is_empty() || component.name.contains(':') {
                return Err(Error::catalog(format!(
                    "invalid component name '{}'",
                    component.name
                )));
            }
            if let Some(default) = &component.default_variant {
                if !component.variants.contains(default) {
                    return Err(Error::catalog(format!(
                        "component '{}': default variant '{}' is not declared",
                        component.name, default
                    )));
                }
            }
            for variant in component.variant_fragments.keys() {
                if !component.variants.contains(variant) {
                    return Err(Error::catalog(format!(
                        "component '{}': fragments for undeclared variant '{}'",
                        component.name, variant
                    )));
                }
            }
            for dependency in &component.dependencies {
                self.check_component_ref(&component.name, dependency)?;
                if dependency.name == component.name {
                    return Err(Error::CycleDetected {
                        cycle: format!("{0} -> {0}", component.name),
                    });
                }
            }
            for conflict in &component.conflicts {
                self.check_component_ref(&component.name, conflict)?;
            }

            let fragment_paths = component
                .fragments
                .keys()
                .chain(component.variant_fragments.values().flat_map(|f| f.keys()));
            self.check_fragments(&component.name, fragment_paths)?;
            self.check_patterns(&component.name, &component.owned_paths, &mut owners)?;
            self.check_patterns(&component.name, &component.data_paths, &mut BTreeMap::new())?;
        }

        for service in self.services.values() {
            for required in &service.requires {
                self.check_component_ref(&service.name, required)?;
            }
            self.check_fragments(&service.name, service.fragments.keys())?;
            self.check_patterns(&service.name, &service.owned_paths, &mut owners)?;
        }

        for shared in self.shared_files.keys() {
            if let Some(owner) = owners
                .iter()
                .find(|(pattern, _)| crate::path::glob_match(pattern, shared).unwrap_or(false))
                .map(|(_, owner)| *owner)
            {
                return Err(Error::catalog(format!(
                    "shared file '{}' is also owned by '{}'",
                    shared, owner
                )));
            }
        }

        Ok(())
    }

    fn check_component_ref(&self, owner: &str, reference: &ComponentRef) -> Result<()> {
        let Some(target) = self.components.get(&reference.name) else {
            return Err(Error::catalog(format!(
                "'{}' references unknown component '{}'",
                owner, reference.name
            )));
        };
        if let Some(variant) = &reference.variant {
            if !target.variants.contains(variant) {
                return Err(Error::catalog(format!(
                    "'{}' references undeclared variant '{}'",
                    owner, reference
                )));
            }
        }
        Ok(())
    }

    fn check_fragments<'a>(
        &self,
        owner: &str,
        paths: impl Iterator<Item = &'a String>,
    ) -> Result<()> {
        for path in paths {
            if !self.shared_files.contains_key(path) {
                return Err(Error::catalog(format!(
                    "'{}' contributes to '{}', which is not a declared shared file",
                    owner, path
                )));
            }
        }
        Ok(())
    }

    fn check_patterns<'a>(
        &self,
        owner: &'a str,
        patterns: &'a [String],
        owners: &mut BTreeMap<&'a str, &'a str>,
    ) -> Result<()> {
        for pattern in patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::catalog(format!("'{}': invalid path pattern '{}': {}", owner, pattern, e))
            })?;
            if let Some(previous) = owners.insert(pattern.as_str(), owner) {
                return Err(Error::catalog(format!(
                    "'{}' is owned by both '{}' and '{}'",
                    pattern, previous, owner
                )));
            }
        }
        Ok(())
    }

    /// Kahn's algorithm with a name-ordered ready set, so the order only
    /// depends on the catalog content.
    fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for component in self.components.values() {
            let deps: BTreeSet<&str> = component
                .dependencies
                .iter()
                .map(|d| d.name.as_str())
                .collect();
            in_degree.insert(component.name.as_str(), deps.len());
            for dep in deps {
                dependents
                    .entry(dep)
                    .or_default()
                    .insert(component.name.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.components.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.to_string());
            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.components.len() {
            let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let remaining: BTreeSet<&str> = in_degree
                .keys()
                .copied()
                .filter(|name| !placed.contains(name))
                .collect();
            return Err(Error::CycleDetected {
                cycle: self.describe_cycle(&remaining),
            });
        }

        Ok(order)
    }

    /// Follow dependencies inside the unplaced set until a name repeats.
    fn describe_cycle(&self, remaining: &BTreeSet<&str>) -> String {
        let Some(start) = remaining.iter().next() else {
            return String::new();
        };
        let mut path: Vec<&str> = vec![start];
        let mut current = *start;
        loop {
            let next = self.components[current]
                .dependencies
                .iter()
                .map(|d| d.name.as_str())
                .find(|name| remaining.contains(name));
            let Some(next) = next else {
                break;
            };
            if let Some(position) = path.iter().position(|name| *name == next) {
                let mut cycle: Vec<&str> = path[position..].to_vec();
                cycle.push(next);
                return cycle.join(" -> ");
            }
            path.push(next);
            current = next;
        }
        path.join(" -> ")
    }

    /// Turn user input (`name` or `name:variant`) into a catalog reference.
    pub fn parse_ref(&self, input: &str) -> Result<UnitRef> {
        let reference: ComponentRef = input.parse()?;

        if let Some(component) = self.components.get(&reference.name) {
            if let Some(variant) = &reference.variant {
                component.resolve_variant(Some(variant))?;
            }
            return Ok(UnitRef::Component(reference));
        }
        if self.services.contains_key(&reference.name) {
            if reference.variant.is_some() {
                return Err(Error::Catalog {
                    message: format!("service '{}' does not take a variant", reference.name),
                    hint: Some(format!("use '{}'", reference.name)),
                });
            }
            return Ok(UnitRef::Service(reference.name));
        }

        Err(self.unknown_name(&reference.name))
    }

    fn unknown_name(&self, name: &str) -> Error {
        let names: Vec<&str> = self
            .components
            .keys()
            .chain(self.services.keys())
            .map(String::as_str)
            .collect();
        let hint = match find_similar(name, &names) {
            Some(similar) => format!("did you mean '{}'?", similar),
            None => "run 'project-kit ls' to list available components and services".to_string(),
        };
        Error::Catalog {
            message: format!("unknown component or service '{}'", name),
            hint: Some(hint),
        }
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Components in topological order (dependencies first).
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().map(|name| &self.components[name])
    }

    /// Services in name order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Shared files in path order.
    pub fn shared_files(&self) -> impl Iterator<Item = &SharedFile> {
        self.shared_files.values()
    }

    pub fn shared_file(&self, path: &str) -> Option<&SharedFile> {
        self.shared_files.get(path)
    }

    pub fn is_shared_path(&self, path: &str) -> bool {
        self.shared_files.contains_key(path)
    }

    /// Owned path patterns of a unit. Unknown units own nothing.
    pub fn owned_paths(&self, unit: &UnitRef) -> &[String] {
        match unit {
            UnitRef::Component(r) => self
                .components
                .get(&r.name)
                .map(|c| c.owned_paths.as_slice())
                .unwrap_or_default(),
            UnitRef::Service(name) => self
                .services
                .get(name)
                .map(|s| s.owned_paths.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Data path patterns of a unit. Services have none.
    pub fn data_paths(&self, unit: &UnitRef) -> &[String] {
        match unit {
            UnitRef::Component(r) => self
                .components
                .get(&r.name)
                .map(|c| c.data_paths.as_slice())
                .unwrap_or_default(),
            UnitRef::Service(_) => &[],
        }
    }

    /// Position of a component in the topological order.
    pub fn topo_index(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Component names in topological order.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}
