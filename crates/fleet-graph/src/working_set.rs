//! The subset of manifest packages selected for one run.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use fleet_core::manifest::Manifest;
use fleet_core::package::PackageId;

use crate::error::GraphError;

/// Why a package is part of the working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Rationale {
    /// Selected by the caller (changed, matched a pattern, or `--all`).
    Selected,
    /// Pulled in because it shares a build collection with `via`.
    BuildCollection { via: PackageId },
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::Selected => f.write_str("selected"),
            Rationale::BuildCollection { via } => {
                write!(f, "part of a build collection with {via}")
            }
        }
    }
}

/// Packages selected for a run, each tagged with its rationale.
///
/// Iteration order is by package id, so every derived view is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkingSet {
    entries: BTreeMap<PackageId, Rationale>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every package in the manifest, all tagged [`Rationale::Selected`].
    pub fn all(manifest: &Manifest) -> Self {
        let mut ws = Self::new();
        for name in manifest.package_names() {
            ws.insert(name, Rationale::Selected);
        }
        ws
    }

    /// The named packages, each of which must exist in the manifest.
    pub fn select<I, S>(manifest: &Manifest, names: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ws = Self::new();
        for name in names {
            let name = name.as_ref();
            if !manifest.contains(name) {
                return Err(GraphError::UnknownPackage {
                    package: name.to_string(),
                });
            }
            ws.insert(name, Rationale::Selected);
        }
        Ok(ws)
    }

    /// Insert a package unless already present. Returns `true` if it was added.
    pub fn insert(&mut self, id: impl Into<PackageId>, rationale: Rationale) -> bool {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, rationale);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn rationale(&self, id: &str) -> Option<&Rationale> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PackageId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageId, &Rationale)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<PackageId>> FromIterator<S> for WorkingSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut ws = Self::new();
        for id in iter {
            ws.insert(id, Rationale::Selected);
        }
        ws
    }
}
