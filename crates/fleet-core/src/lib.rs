//! Core data types for the Fleet build orchestrator.
//!
//! This crate defines the fundamental types that describe a monorepo to
//! Fleet: packages and their kinds, dependency declarations with version
//! constraints, version templates, the `fleet.toml` manifest, and global
//! user configuration.
//!
//! This crate is intentionally free of async code and process I/O.

/// File name of the monorepo manifest.
pub const MANIFEST_FILE: &str = "fleet.toml";

pub mod config;
pub mod dependency;
pub mod manifest;
pub mod package;
pub mod version;
