//! Shared utilities for the Fleet build orchestrator.
//!
//! This crate provides cross-cutting concerns used by all other Fleet crates:
//! error types, filesystem helpers, async process spawning, and terminal
//! status and progress indicators.

pub mod errors;
pub mod fs;
pub mod process;
pub mod progress;
