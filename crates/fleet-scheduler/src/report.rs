//! Final partition of the working set into built and failed packages.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use fleet_core::package::PackageId;

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn opt_as_millis<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}

/// Why a package ended up in the failed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The package's own build was attempted and failed.
    Build { message: String },
    /// Never attempted: `origin`, a transitive dependency, failed to build.
    Cascade { origin: PackageId },
}

impl FailureReason {
    pub fn is_cascade(&self) -> bool {
        matches!(self, Self::Cascade { .. })
    }

    /// The package whose own build failed.
    pub fn origin<'a>(&'a self, failed: &'a str) -> &'a str {
        match self {
            Self::Build { .. } => failed,
            Self::Cascade { origin } => origin,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build { message } => f.write_str(message),
            Self::Cascade { origin } => write!(f, "not built: dependency '{origin}' failed"),
        }
    }
}

/// A package that built successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltPackage {
    pub package: PackageId,
    pub version: String,
    /// Position in dispatch order, starting at 0.
    pub dispatch_seq: u64,
    /// Position in completion order, starting at 0.
    pub finish_seq: u64,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// A package that failed directly or by cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPackage {
    pub package: PackageId,
    pub reason: FailureReason,
    /// `None` for cascade failures, which are never dispatched.
    #[serde(rename = "duration_ms", serialize_with = "opt_as_millis")]
    pub duration: Option<Duration>,
}

/// The outcome of a run: every working-set package appears exactly once,
/// in either `built` or `failed`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub built: Vec<BuiltPackage>,
    pub failed: Vec<FailedPackage>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl BuildReport {
    /// Whether no package failed. Callers decide what success means; this is
    /// the usual judgment.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.built.len() + self.failed.len()
    }

    pub fn built_ids(&self) -> Vec<&str> {
        self.built.iter().map(|b| b.package.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.package.as_str()).collect()
    }

    pub fn built_package(&self, id: &str) -> Option<&BuiltPackage> {
        self.built.iter().find(|b| b.package == id)
    }

    pub fn failure(&self, id: &str) -> Option<&FailedPackage> {
        self.failed.iter().find(|f| f.package == id)
    }

    /// Packages whose own build failed.
    pub fn direct_failures(&self) -> impl Iterator<Item = &FailedPackage> {
        self.failed.iter().filter(|f| !f.reason.is_cascade())
    }

    /// Packages skipped because a dependency failed.
    pub fn cascade_failures(&self) -> impl Iterator<Item = &FailedPackage> {
        self.failed.iter().filter(|f| f.reason.is_cascade())
    }
}
