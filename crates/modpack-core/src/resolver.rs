//! Dependency validation and load-order resolution.
//!
//! Missing required dependencies abort resolution; missing optional ones are
//! dropped before ordering. The order itself is Kahn's algorithm over the
//! remaining edges, always releasing the lexicographically smallest ready
//! package so the same input yields the same order. The base packages are
//! treated as already loaded: edges to them never block anything.

use crate::package::{BASE_PACKAGES, DependencyKind, Package};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal resolution failures. Any of these aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("package '{package}' requires '{dependency}', which is not installed")]
    UnresolvedRequiredDependency { package: String, dependency: String },

    #[error("dependency cycle among packages: {}", packages.join(", "))]
    DependencyCycle { packages: Vec<String> },

    #[error("duplicate package name '{name}'")]
    DuplicatePackage { name: String },
}

// ---------------------------------------------------------------------------
// Load order
// ---------------------------------------------------------------------------

/// Discovered packages in an order where every dependency precedes its
/// dependents. Dependencies on absent optional packages have been removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOrder {
    packages: Vec<Package>,
}

impl LoadOrder {
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Validate dependencies and compute the load order of `packages`.
///
/// The base packages are implicitly known and must not appear in `packages`.
pub fn resolve_load_order(mut packages: Vec<Package>) -> Result<LoadOrder, ResolveError> {
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    let mut known: HashSet<String> = BASE_PACKAGES.iter().map(|s| s.to_string()).collect();
    for pkg in &packages {
        if !known.insert(pkg.name.clone()) {
            return Err(ResolveError::DuplicatePackage {
                name: pkg.name.clone(),
            });
        }
    }

    for pkg in &mut packages {
        prune_dependencies(pkg, &known)?;
    }

    // Packages are sorted by name, so index order is name order and the
    // ready set can hold plain indices.
    let position: HashMap<&str, usize> = packages
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; packages.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); packages.len()];
    for (i, pkg) in packages.iter().enumerate() {
        for dep in pkg.dependencies.keys() {
            // Base packages have no position: already loaded.
            if let Some(&j) = position.get(dep.as_str()) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order: Vec<usize> = Vec::with_capacity(packages.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if order.len() < packages.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d > 0)
            .map(|(i, _)| packages[i].name.clone())
            .collect();
        return Err(ResolveError::DependencyCycle { packages: stuck });
    }

    let mut slots: Vec<Option<Package>> = packages.into_iter().map(Some).collect();
    let packages = order.into_iter().filter_map(|i| slots[i].take()).collect();
    Ok(LoadOrder { packages })
}

/// Fail on a missing required dependency; drop missing optional ones.
fn prune_dependencies(pkg: &mut Package, known: &HashSet<String>) -> Result<(), ResolveError> {
    let mut dropped = Vec::new();
    for (dep, kind) in &pkg.dependencies {
        if known.contains(dep) {
            continue;
        }
        match kind {
            DependencyKind::Required => {
                return Err(ResolveError::UnresolvedRequiredDependency {
                    package: pkg.name.clone(),
                    dependency: dep.clone(),
                });
            }
            DependencyKind::Optional => dropped.push(dep.clone()),
        }
    }
    for dep in dropped {
        debug!(package = %pkg.name, dependency = %dep, "dropping absent optional dependency");
        pkg.dependencies.remove(&dep);
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
