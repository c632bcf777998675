// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::config::model::ConfigFile;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: commands that must be ready before this one starts.
    deps: Vec<String>,
    /// Direct dependents: commands that depend on this one.
    dependents: Vec<String>,
}

/// In-memory dependency graph keyed by command name.
///
/// Acyclicity and dependency resolution are already checked in
/// `config::validate`; this only keeps adjacency for scheduling and
/// the `--dry-run` listing.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<String, DagNode>,
}

impl DagGraph {
    /// Build the graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut nodes: BTreeMap<String, DagNode> = cfg
            .commands
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    DagNode {
                        deps: spec.depends_on.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, spec) in cfg.commands.iter() {
            for dep in &spec.depends_on {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// All command names, sorted.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Commands without dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.deps.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Immediate dependencies of a command (its `depends` list).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a command.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
