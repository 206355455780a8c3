use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Placeholder constraint meaning "whatever this run builds".
pub const LATEST: &str = "LATEST";

/// A dependency entry in a `[[package]]` table.
///
/// Supports both shorthand (`"base"`, constraint `LATEST`) and detailed
/// (`{ package = "base", version = "1.2.0.4" }`) forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Short(String),
    Detailed(DetailedDependency),
}

/// A dependency with an explicit version constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependency {
    pub package: String,
    #[serde(default = "default_constraint")]
    pub version: String,
}

fn default_constraint() -> String {
    LATEST.to_string()
}

impl Dependency {
    /// Name of the package depended upon.
    pub fn package(&self) -> &str {
        match self {
            Dependency::Short(name) => name,
            Dependency::Detailed(d) => &d.package,
        }
    }

    /// Normalize into a `{package, constraint}` declaration.
    pub fn to_decl(&self) -> DependencyDecl {
        let constraint = match self {
            Dependency::Short(_) => VersionConstraint::Latest,
            Dependency::Detailed(d) => VersionConstraint::parse(&d.version),
        };
        DependencyDecl {
            package: self.package().to_string(),
            constraint,
        }
    }
}

/// Version requirement on a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionConstraint {
    /// Symbolic placeholder, replaced once the dependency is built.
    Latest,
    /// A concrete version, either pinned in the manifest or resolved by a build.
    Exact(String),
}

impl VersionConstraint {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(LATEST) {
            Self::Latest
        } else {
            Self::Exact(s.to_string())
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Latest)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Exact(v) => v,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One `{dependencyId, versionConstraint}` pair owned by a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyDecl {
    pub package: String,
    #[serde(rename = "version")]
    pub constraint: VersionConstraint,
}

impl DependencyDecl {
    pub fn latest(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            constraint: VersionConstraint::Latest,
        }
    }

    /// A copy of this declaration pinned to `version`.
    pub fn resolved_to(&self, version: impl Into<String>) -> Self {
        Self {
            package: self.package.clone(),
            constraint: VersionConstraint::Exact(version.into()),
        }
    }
}

impl fmt::Display for DependencyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.constraint)
    }
}
