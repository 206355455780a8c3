//! Build collection expansion.
//!
//! Collections form an undirected graph over package ids. Selecting any
//! member of a connected component pulls the whole component into the
//! working set.

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Dfs;

use fleet_core::manifest::{BuildCollection, Manifest};

use crate::error::GraphError;
use crate::working_set::{Rationale, WorkingSet};

/// Undirected "build together" relation built from `[[collection]]` tables.
pub struct CollectionGraph<'a> {
    graph: UnGraphMap<&'a str, ()>,
}

impl<'a> CollectionGraph<'a> {
    /// Build the relation, rejecting members the manifest does not declare.
    pub fn new(manifest: &'a Manifest) -> Result<Self, GraphError> {
        let mut graph = UnGraphMap::new();
        for (i, collection) in manifest.collections.iter().enumerate() {
            for member in &collection.members {
                if !manifest.contains(member) {
                    return Err(GraphError::UnknownCollectionMember {
                        collection: label(collection, i),
                        package: member.clone(),
                    });
                }
                graph.add_node(member.as_str());
            }
            for pair in collection.members.windows(2) {
                if pair[0] != pair[1] {
                    graph.add_edge(pair[0].as_str(), pair[1].as_str(), ());
                }
            }
        }
        Ok(Self { graph })
    }

    /// Packages connected to `id`, including `id` when it belongs to a collection.
    pub fn component_of(&self, id: &str) -> Vec<&'a str> {
        let Some(start) = self.graph.nodes().find(|n| *n == id) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut reached = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            reached.push(node);
        }
        reached
    }

    /// Union every collection component touching `working_set` into it.
    ///
    /// Newly added packages are tagged [`Rationale::BuildCollection`] naming
    /// the selected package that pulled them in.
    pub fn expand(&self, working_set: &WorkingSet) -> WorkingSet {
        let mut expanded = working_set.clone();
        for selected in working_set.ids() {
            for member in self.component_of(selected) {
                if expanded.insert(
                    member,
                    Rationale::BuildCollection {
                        via: selected.clone(),
                    },
                ) {
                    tracing::debug!(package = member, via = %selected, "added by build collection");
                }
            }
        }
        expanded
    }
}

fn label(collection: &BuildCollection, index: usize) -> String {
    match &collection.name {
        Some(name) => format!("'{name}'"),
        None => format!("#{}", index + 1),
    }
}

/// Expand `working_set` with the manifest's build collections.
pub fn expand(manifest: &Manifest, working_set: &WorkingSet) -> Result<WorkingSet, GraphError> {
    Ok(CollectionGraph::new(manifest)?.expand(working_set))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
[[package]]
name = "x"
[[package]]
name = "y"
[[package]]
name = "z"
[[package]]
name = "w"
[[package]]
name = "lonely"

[[collection]]
members = ["x", "y"]

[[collection]]
name = "yz"
members = ["y", "z"]
"#;

    #[test]
    fn selecting_one_member_pulls_the_component() {
        let m = Manifest::from_str(TOML).unwrap();
        let ws = WorkingSet::select(&m, ["x"]).unwrap();
        let expanded = expand(&m, &ws).unwrap();
        let ids: Vec<_> = expanded.ids().map(String::as_str).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(expanded.rationale("x"), Some(&Rationale::Selected));
        assert_eq!(
            expanded.rationale("z"),
            Some(&Rationale::BuildCollection { via: "x".into() })
        );
    }

    #[test]
    fn packages_outside_collections_are_untouched() {
        let m = Manifest::from_str(TOML).unwrap();
        let ws = WorkingSet::select(&m, ["lonely"]).unwrap();
        let expanded = expand(&m, &ws).unwrap();
        assert_eq!(expanded, ws);
    }

    #[test]
    fn already_selected_keep_their_rationale() {
        let m = Manifest::from_str(TOML).unwrap();
        let ws = WorkingSet::select(&m, ["x", "z"]).unwrap();
        let expanded = expand(&m, &ws).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded.rationale("z"), Some(&Rationale::Selected));
    }

    #[test]
    fn unknown_member_is_fatal() {
        let m = Manifest::from_str(
            r#"
[[package]]
name = "x"
[[collection]]
name = "broken"
members = ["x", "nope"]
"#,
        )
        .unwrap();
        let err = expand(&m, &WorkingSet::new()).err().unwrap();
        assert_eq!(
            err,
            GraphError::UnknownCollectionMember {
                collection: "'broken'".into(),
                package: "nope".into()
            }
        );
    }

    #[test]
    fn empty_working_set_stays_empty() {
        let m = Manifest::from_str(TOML).unwrap();
        assert!(expand(&m, &WorkingSet::new()).unwrap().is_empty());
    }
}
