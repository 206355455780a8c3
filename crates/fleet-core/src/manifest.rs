use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use fleet_util::errors::FleetError;

use crate::package::{PackageId, PackageSpec};

/// The parsed representation of a `fleet.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub build: BuildSettings,

    #[serde(default, rename = "package")]
    pub packages: Vec<PackageSpec>,

    #[serde(default, rename = "collection")]
    pub collections: Vec<BuildCollection>,
}

/// Per-repository build defaults from the `[build]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default)]
    pub jobs: Option<u32>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
    #[serde(default, rename = "build-number")]
    pub build_number: Option<u64>,
}

/// A `[[collection]]` entry: packages that must be built together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCollection {
    #[serde(default)]
    pub name: Option<String>,
    pub members: Vec<PackageId>,
}

impl Manifest {
    /// Load, parse and validate a `fleet.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FleetError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate a `fleet.toml` from a string.
    pub fn from_str(content: &str) -> miette::Result<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| FleetError::Manifest {
            message: format!("Failed to parse fleet.toml: {e}"),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject duplicate package names and dependencies on unknown packages.
    ///
    /// Build collection members are checked when collections are expanded.
    pub fn validate(&self) -> Result<(), FleetError> {
        let mut seen = HashSet::new();
        for pkg in &self.packages {
            if pkg.name.trim().is_empty() {
                return Err(FleetError::Manifest {
                    message: "package with an empty name".to_string(),
                });
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(FleetError::Manifest {
                    message: format!("package '{}' is declared more than once", pkg.name),
                });
            }
        }

        for pkg in &self.packages {
            for dep in pkg.dependency_names() {
                if dep == pkg.name {
                    return Err(FleetError::Manifest {
                        message: format!("package '{}' depends on itself", pkg.name),
                    });
                }
                if !seen.contains(dep) {
                    return Err(FleetError::Manifest {
                        message: format!(
                            "package '{}' depends on '{dep}', which is not declared in the manifest",
                            pkg.name
                        ),
                    });
                }
            }
        }

        tracing::debug!(
            packages = self.packages.len(),
            collections = self.collections.len(),
            "manifest validated"
        );
        Ok(())
    }

    /// Look up a package by name.
    pub fn package(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.package(name).is_some()
    }

    /// All package names in declaration order.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }
}
