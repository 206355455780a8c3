//! Package selection by glob pattern.

use globset::Glob;

use fleet_core::manifest::Manifest;
use fleet_graph::WorkingSet;
use fleet_util::errors::FleetError;

/// Pick the packages whose names match any of `patterns`.
///
/// No patterns (or `all`) selects the whole manifest. Every pattern must
/// match at least one package.
pub fn select(manifest: &Manifest, patterns: &[String], all: bool) -> miette::Result<WorkingSet> {
    if all || patterns.is_empty() {
        return Ok(WorkingSet::all(manifest));
    }

    let mut names = Vec::new();
    for pattern in patterns {
        let matcher = Glob::new(pattern)
            .map_err(|e| FleetError::Config {
                message: format!("Invalid package pattern '{pattern}': {e}"),
            })?
            .compile_matcher();
        let before = names.len();
        names.extend(
            manifest
                .package_names()
                .filter(|name| matcher.is_match(name))
                .map(str::to_string),
        );
        if names.len() == before {
            return Err(FleetError::Config {
                message: format!("Package pattern '{pattern}' did not match any package"),
            }
            .into());
        }
    }

    tracing::debug!(selected = names.len(), "selected packages");
    Ok(WorkingSet::select(manifest, names)?)
}
