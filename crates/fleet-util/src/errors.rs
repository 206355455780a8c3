use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Fleet operations.
#[derive(Debug, Error, Diagnostic)]
pub enum FleetError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. fleet.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your fleet.toml for syntax errors and unknown package names"))]
    Manifest { message: String },

    /// The dependency graph or build collections cannot be scheduled.
    #[error("Dependency graph error: {message}")]
    Graph { message: String },

    /// Invalid configuration (CLI flags, global config, package selection).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A build could not be started or the scheduler lost track of a package.
    #[error("Build failed: {message}")]
    Build { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}
