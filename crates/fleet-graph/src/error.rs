use miette::Diagnostic;
use thiserror::Error;

use fleet_util::errors::FleetError;

/// Fatal graph conditions, raised before any package is built.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphError {
    /// The working set contains at least one dependency cycle.
    #[error("Dependency cycle detected among: {}", members.join(", "))]
    #[diagnostic(help("Break the cycle by removing one of the dependencies between these packages"))]
    Cycle { members: Vec<String> },

    /// A package was selected or referenced that the manifest does not declare.
    #[error("Unknown package '{package}'")]
    UnknownPackage { package: String },

    /// A build collection names a package that the manifest does not declare.
    #[error("Build collection {collection} references unknown package '{package}'")]
    #[diagnostic(help("Every [[collection]] member must be a declared [[package]]"))]
    UnknownCollectionMember { collection: String, package: String },
}

impl From<GraphError> for FleetError {
    fn from(e: GraphError) -> Self {
        FleetError::Graph {
            message: e.to_string(),
        }
    }
}
