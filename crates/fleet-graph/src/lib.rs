//! Package graph engine: working-set selection, dependency adjacency views,
//! batching topological sort with cycle detection, and build collection
//! expansion.
//!
//! Every transform here is pure and runs once, before scheduling starts.

pub mod collection;
pub mod error;
pub mod graph;
pub mod topo;
pub mod working_set;

pub use error::GraphError;
pub use graph::DependencyGraph;
pub use working_set::{Rationale, WorkingSet};
