//! # Dependency Resolver
//!
//! Computes the enabled set a command leads to, starting from the project
//! manifest and a requested delta (units to add and units to remove).
//!
//! ## Modes
//!
//! - **Auto**: every requested addition brings its transitive dependencies
//!   along (and a service its required components). A dependency that does
//!   not pin a variant uses the component's default variant.
//! - **Strict**: requested additions are taken at face value. A dependency
//!   that is neither enabled nor part of the request is reported as
//!   [`ResolutionError::MissingDependency`].
//!
//! The resolver never stops at the first problem: every dependency problem is
//! collected in [`Resolution::errors`] so a single run can report all of them.
//! The `Err` arm of [`resolve`] is reserved for malformed requests (names the
//! catalog does not know).
//!
//! ## Determinism
//!
//! `additions` and `removals` follow the catalog's topological order
//! (dependencies first); service lists are sorted by name. The same inputs
//! always produce the same [`Resolution`].

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, ComponentRef, UnitRef};
use crate::error::{Error, ResolutionError, Result};
use crate::manifest::ProjectManifest;

/// How unmet dependencies are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Fail on any dependency that is not enabled or requested.
    Strict,
    /// Enable missing dependencies automatically.
    Auto,
}

/// Outcome of resolving a requested change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Components enabled after the change, with their variant.
    pub target_components: BTreeMap<String, Option<String>>,
    pub target_services: BTreeSet<String>,
    /// Components to enable, including the new side of a variant switch.
    pub additions: Vec<ComponentRef>,
    /// Components to disable, including the old side of a variant switch.
    pub removals: Vec<ComponentRef>,
    pub service_additions: Vec<String>,
    pub service_removals: Vec<String>,
    /// Components enabled because something required them, not because they
    /// were requested.
    pub implied: Vec<String>,
    pub errors: Vec<ResolutionError>,
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the change leaves the enabled set as it is.
    pub fn is_noop(&self) -> bool {
        self.additions.is_empty()
            && self.removals.is_empty()
            && self.service_additions.is_empty()
            && self.service_removals.is_empty()
    }

    /// Turn collected problems into an error.
    pub fn into_result(self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(Error::Resolution {
                errors: self.errors,
            })
        }
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    fn error(&mut self, error: ResolutionError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }
}

/// Resolve a requested delta against the current project state.
pub fn resolve(
    catalog: &Catalog,
    current: &ProjectManifest,
    additions: &[UnitRef],
    removals: &[UnitRef],
    mode: Mode,
) -> Result<Resolution> {
    check_known(catalog, additions.iter().chain(removals))?;

    let mut resolution = Resolution::default();
    let mut components = current.enabled_components.clone();
    let mut services = current.enabled_services.clone();

    // Later requests for the same component win.
    let mut requested: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut requested_services: BTreeSet<String> = BTreeSet::new();
    for unit in additions {
        match unit {
            UnitRef::Component(r) => {
                if let Some(previous) = requested.get(&r.name) {
                    if previous != &r.variant {
                        let earlier = ComponentRef {
                            name: r.name.clone(),
                            variant: previous.clone(),
                        };
                        resolution.warn(format!(
                            "'{}' was requested more than once; using '{}' and ignoring '{}'",
                            r.name, r, earlier
                        ));
                    }
                }
                requested.insert(r.name.clone(), r.variant.clone());
            }
            UnitRef::Service(name) => {
                requested_services.insert(name.clone());
            }
        }
    }

    let mut removed: BTreeSet<String> = BTreeSet::new();
    let mut removed_services: BTreeSet<String> = BTreeSet::new();
    for unit in removals {
        if additions.iter().any(|a| a.name() == unit.name()) {
            return Err(Error::Catalog {
                message: format!("'{}' is both added and removed", unit.name()),
                hint: None,
            });
        }
        match unit {
            UnitRef::Component(r) => {
                if !current.enabled_components.contains_key(&r.name) {
                    resolution.warn(format!("'{}' is not enabled; nothing to remove", r.name));
                    continue;
                }
                let removable = catalog
                    .component(&r.name)
                    .map(|c| c.removable)
                    .unwrap_or(true);
                if !removable {
                    resolution.error(ResolutionError::NotRemovable {
                        component: r.name.clone(),
                    });
                    continue;
                }
                removed.insert(r.name.clone());
            }
            UnitRef::Service(name) => {
                if !current.enabled_services.contains(name) {
                    resolution.warn(format!("'{}' is not enabled; nothing to remove", name));
                    continue;
                }
                removed_services.insert(name.clone());
            }
        }
    }

    for name in &removed {
        components.remove(name);
    }
    for name in &removed_services {
        services.remove(name);
    }

    for (name, variant) in &requested {
        let Some(component) = catalog.component(name) else {
            continue;
        };
        let chosen = match variant {
            Some(v) => Some(v.clone()),
            None => match components.get(name) {
                Some(enabled) => enabled.clone(),
                None => component.resolve_variant(None)?,
            },
        };
        components.insert(name.clone(), chosen);
    }
    services.extend(requested_services.iter().cloned());

    check_dependents(catalog, &components, &services, &removed, &mut resolution);
    close_dependencies(catalog, &mut components, &services, &removed, mode, &mut resolution)?;
    check_conflicts(catalog, current, &components, &mut resolution);

    let order = |r: &ComponentRef| catalog.topo_index(&r.name).unwrap_or(usize::MAX);
    for (name, variant) in &components {
        if current.enabled_components.get(name) != Some(variant) {
            resolution.additions.push(ComponentRef {
                name: name.clone(),
                variant: variant.clone(),
            });
        }
    }
    for (name, variant) in &current.enabled_components {
        if components.get(name) != Some(variant) {
            resolution.removals.push(ComponentRef {
                name: name.clone(),
                variant: variant.clone(),
            });
        }
    }
    resolution.additions.sort_by_key(order);
    resolution.removals.sort_by_key(order);
    resolution.implied.sort_by_key(|name| catalog.topo_index(name).unwrap_or(usize::MAX));

    resolution.service_additions = services
        .difference(&current.enabled_services)
        .cloned()
        .collect();
    resolution.service_removals = current
        .enabled_services
        .difference(&services)
        .cloned()
        .collect();

    resolution.target_components = components;
    resolution.target_services = services;

    log::debug!(
        "Resolved {:?} mode: +{:?} -{:?} services +{:?} -{:?} ({} error(s))",
        mode,
        resolution.additions,
        resolution.removals,
        resolution.service_additions,
        resolution.service_removals,
        resolution.errors.len()
    );
    Ok(resolution)
}

fn check_known<'a>(catalog: &Catalog, units: impl Iterator<Item = &'a UnitRef>) -> Result<()> {
    for unit in units {
        // Round-trips through the catalog so unknown names and bad variants
        // get the same message and hint as user input.
        catalog.parse_ref(&unit.to_string())?;
    }
    Ok(())
}

/// Units left in the target set that still need a removed component.
fn check_dependents(
    catalog: &Catalog,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    removed: &BTreeSet<String>,
    resolution: &mut Resolution,
) {
    for name in removed {
        let mut dependents: Vec<String> = components
            .keys()
            .filter(|c| {
                catalog
                    .component(c)
                    .map(|c| c.dependencies.iter().any(|d| &d.name == name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        dependents.extend(
            services
                .iter()
                .filter(|s| {
                    catalog
                        .service(s)
                        .map(|s| s.requires.iter().any(|r| &r.name == name))
                        .unwrap_or(false)
                })
                .cloned(),
        );

        if !dependents.is_empty() {
            resolution.error(ResolutionError::DependentsStillPresent {
                component: name.clone(),
                dependents,
            });
        }
    }
}

/// Walk the requirements of every target unit, enabling missing ones in auto
/// mode and reporting them in strict mode.
fn close_dependencies(
    catalog: &Catalog,
    components: &mut BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    removed: &BTreeSet<String>,
    mode: Mode,
    resolution: &mut Resolution,
) -> Result<()> {
    let mut pending: Vec<(String, ComponentRef)> = Vec::new();
    for service in services {
        if let Some(s) = catalog.service(service) {
            pending.extend(s.requires.iter().map(|r| (service.clone(), r.clone())));
        }
    }
    for name in components.keys() {
        if let Some(c) = catalog.component(name) {
            pending.extend(c.dependencies.iter().map(|d| (name.clone(), d.clone())));
        }
    }
    // Process in a stable order: by owner, then by dependency.
    pending.sort();
    pending.reverse();

    while let Some((owner, dependency)) = pending.pop() {
        if removed.contains(&dependency.name) {
            continue;
        }
        match components.get(&dependency.name) {
            Some(enabled) => {
                if let Some(required) = &dependency.variant {
                    if enabled.as_ref() != Some(required) {
                        resolution.error(ResolutionError::IncompatibleVariant {
                            component: owner,
                            dependency: dependency.name.clone(),
                            required: required.clone(),
                            enabled: enabled.clone().unwrap_or_else(|| "none".to_string()),
                        });
                    }
                }
            }
            None => match mode {
                Mode::Strict => resolution.error(ResolutionError::MissingDependency {
                    component: owner,
                    missing: dependency.to_string(),
                }),
                Mode::Auto => {
                    let Some(component) = catalog.component(&dependency.name) else {
                        continue;
                    };
                    let variant = component.resolve_variant(dependency.variant.as_deref())?;
                    log::debug!("'{}' requires '{}'; enabling it", owner, dependency.name);
                    components.insert(dependency.name.clone(), variant);
                    resolution.implied.push(dependency.name.clone());
                    let mut transitive: Vec<(String, ComponentRef)> = component
                        .dependencies
                        .iter()
                        .map(|d| (dependency.name.clone(), d.clone()))
                        .collect();
                    transitive.sort();
                    pending.extend(transitive.into_iter().rev());
                }
            },
        }
    }
    Ok(())
}

/// Record every mutually exclusive pair in the target set once.
fn check_conflicts(
    catalog: &Catalog,
    current: &ProjectManifest,
    components: &BTreeMap<String, Option<String>>,
    resolution: &mut Resolution,
) {
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    for name in catalog.order() {
        if !components.contains_key(name) {
            continue;
        }
        let Some(component) = catalog.component(name) else {
            continue;
        };
        for conflict in &component.conflicts {
            let Some(other_variant) = components.get(&conflict.name) else {
                continue;
            };
            if conflict.variant.is_some() && &conflict.variant != other_variant {
                continue;
            }
            let key = if name < &conflict.name {
                (name.clone(), conflict.name.clone())
            } else {
                (conflict.name.clone(), name.clone())
            };
            if !seen.insert(key) {
                continue;
            }
            // Report the newly enabled side first.
            let (first, second) = if current.enabled_components.contains_key(name)
                && !current.enabled_components.contains_key(&conflict.name)
            {
                (conflict.name.clone(), name.clone())
            } else {
                (name.clone(), conflict.name.clone())
            };
            resolution.error(ResolutionError::ConflictingComponents { first, second });
        }
    }
}
