use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, DependencyDecl};
use crate::version::VersionTemplate;

/// Opaque unique package identifier, stable for the duration of a run.
pub type PackageId = String;

/// Declared package type; drives dispatch priority only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Versioned, installable package.
    #[default]
    Unlocked,
    /// Source-only package deployed as-is.
    Source,
    /// Data package (records, fixtures).
    Data,
}

impl PackageKind {
    /// Source and data packages carry content, not a versioned artifact.
    pub fn is_content_only(self) -> bool {
        matches!(self, Self::Source | Self::Data)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unlocked => "unlocked",
            Self::Source => "source",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package entry from a `[[package]]` table in `fleet.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: PackageId,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub version: VersionTemplate,
    #[serde(default, rename = "type")]
    pub kind: PackageKind,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl PackageSpec {
    /// Directory of the package relative to the manifest; defaults to its name.
    pub fn path(&self) -> &Path {
        self.path
            .as_deref()
            .unwrap_or_else(|| Path::new(self.name.as_str()))
    }

    /// Normalized dependency declarations, in declaration order.
    pub fn dependency_decls(&self) -> Vec<DependencyDecl> {
        self.dependencies.iter().map(Dependency::to_decl).collect()
    }

    /// Names of the packages this one depends on.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(Dependency::package)
    }
}
