pub mod ops_build;
pub mod ops_graph;
pub mod ops_plan;
pub mod progress;
pub mod selection;

use std::path::{Path, PathBuf};

use fleet_core::config::GlobalConfig;
use fleet_core::manifest::Manifest;
use fleet_core::MANIFEST_FILE;
use fleet_graph::{collection, WorkingSet};
use fleet_util::errors::FleetError;
use fleet_util::fs::find_ancestor_with;

/// Everything an operation needs to know about the monorepo it runs in.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// Directory holding `fleet.toml`; package paths are relative to it.
    pub root: PathBuf,
    pub manifest: Manifest,
    pub global: GlobalConfig,
}

impl RepoContext {
    /// Find `fleet.toml` in `start` or its ancestors and load it together
    /// with the user's global config.
    pub fn load(start: &Path) -> miette::Result<Self> {
        Self::load_with(start, GlobalConfig::load()?)
    }

    /// Like [`RepoContext::load`] with an explicit global config.
    pub fn load_with(start: &Path, global: GlobalConfig) -> miette::Result<Self> {
        let root = find_ancestor_with(start, MANIFEST_FILE).ok_or_else(|| FleetError::Manifest {
            message: format!(
                "Could not find {MANIFEST_FILE} in {} or any parent directory",
                start.display()
            ),
        })?;
        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = Manifest::from_path(&manifest_path)?;
        tracing::debug!(
            root = %root.display(),
            packages = manifest.packages.len(),
            "loaded manifest"
        );
        Ok(Self {
            root,
            manifest,
            global,
        })
    }

    /// Select packages by glob and pull in their build collections.
    pub fn working_set(&self, patterns: &[String], all: bool) -> miette::Result<WorkingSet> {
        let selected = selection::select(&self.manifest, patterns, all)?;
        Ok(collection::expand(&self.manifest, &selected)?)
    }
}
