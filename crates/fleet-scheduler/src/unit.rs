//! The build-unit seam between the scheduler and whatever "building" means.
//!
//! Implement [`BuildUnit`] to plug in a backend; the scheduler only ever
//! sees a [`BuildOutcome`]. Timeouts and retries belong to the backend and
//! surface here as ordinary failures.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use fleet_core::dependency::DependencyDecl;
use fleet_core::package::{PackageId, PackageKind};
use fleet_core::version::VersionTemplate;

/// Everything a backend needs to build one package.
///
/// `dependencies` is a snapshot taken at dispatch time: every `LATEST`
/// placeholder whose package already succeeded in this run carries the
/// concrete version that build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest {
    pub package: PackageId,
    pub kind: PackageKind,
    pub path: PathBuf,
    pub version: VersionTemplate,
    pub command: Option<String>,
    pub dependencies: Vec<DependencyDecl>,
}

impl BuildRequest {
    /// Version this request declares for `dependency`, if it depends on it.
    pub fn dependency_version(&self, dependency: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.package == dependency)
            .map(|d| d.constraint.as_str())
    }
}

/// Result of one build-unit invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success { version: String },
    Failure { reason: String },
}

impl BuildOutcome {
    pub fn success(version: impl Into<String>) -> Self {
        Self::Success {
            version: version.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Trait implemented by each build backend.
pub trait BuildUnit: Send + Sync + 'static {
    /// Build one package and report its resolved version or a failure reason.
    fn build(&self, request: BuildRequest) -> impl Future<Output = BuildOutcome> + Send;
}

/// Adapter turning an async closure into a [`BuildUnit`].
pub struct FnBuildUnit<F>(pub F);

impl<F, Fut> BuildUnit for FnBuildUnit<F>
where
    F: Fn(BuildRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BuildOutcome> + Send + 'static,
{
    fn build(&self, request: BuildRequest) -> impl Future<Output = BuildOutcome> + Send {
        (self.0)(request)
    }
}
