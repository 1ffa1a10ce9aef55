// SPDX-License-Identifier: MIT

//! The dependency resolver (C4): builds a graph of hard/soft edges between
//! registered units, detects cycles and version conflicts, and layers the
//! remaining DAG into waves for parallel scheduling.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod plan;

pub use error::DepGraphError;
pub use plan::{DependencyPlan, ResolutionWarning};

use aeon_core::{Manifest, UnitId};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Builds a [`DependencyPlan`] from a set of manifests.
pub struct GraphBuilder {
    manifests: HashMap<UnitId, Manifest>,
    conflicts: Vec<DepGraphError>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self { manifests: HashMap::new(), conflicts: Vec::new() }
    }

    /// Add a manifest to the candidate set. A second manifest registered
    /// under the same id with a different `version` is a version conflict,
    /// reported at `resolve()` time.
    pub fn add(&mut self, manifest: Manifest) {
        if let Some(existing) = self.manifests.get(&manifest.id) {
            if existing.version != manifest.version {
                self.conflicts.push(DepGraphError::VersionConflict {
                    unit: manifest.id.clone(),
                    existing: existing.version.clone(),
                    incoming: manifest.version.clone(),
                });
            }
        }
        self.manifests.insert(manifest.id.clone(), manifest);
    }

    pub fn from_manifests(manifests: impl IntoIterator<Item = Manifest>) -> Self {
        let mut builder = Self::new();
        for m in manifests {
            builder.add(m);
        }
        builder
    }

    /// Resolve the graph: check hard-dep completeness, detect cycles, layer
    /// into waves by Kahn's algorithm, and collect soft-dep warnings.
    pub fn resolve(&self) -> Result<DependencyPlan, DepGraphError> {
        if let Some(conflict) = self.conflicts.first() {
            return Err(conflict.clone());
        }

        for manifest in self.manifests.values() {
            for dep in &manifest.hard_deps {
                if !self.manifests.contains_key(dep) {
                    return Err(DepGraphError::MissingDependency {
                        unit: manifest.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        let mut graph: DiGraph<UnitId, ()> = DiGraph::new();
        let mut index_of: HashMap<UnitId, NodeIndex> = HashMap::new();
        for id in self.manifests.keys() {
            index_of.insert(id.clone(), graph.add_node(id.clone()));
        }
        for manifest in self.manifests.values() {
            for dep in &manifest.hard_deps {
                // Edge direction: dependency -> dependent, so a wave only
                // contains units whose hard deps are all in earlier waves.
                graph.add_edge(index_of[dep], index_of[&manifest.id], ());
            }
        }

        if is_cyclic_directed(&graph) {
            let cycle = find_cycle_path(&self.manifests);
            return Err(DepGraphError::CycleDetected { path: cycle });
        }

        let waves = layer_waves(&graph, &index_of);
        let warnings = soft_dep_warnings(&self.manifests);

        Ok(DependencyPlan { waves, warnings })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Kahn's algorithm, grouping each round of zero-in-degree nodes into one
/// wave instead of emitting a single flat order.
fn layer_waves(graph: &DiGraph<UnitId, ()>, index_of: &HashMap<UnitId, NodeIndex>) -> Vec<Vec<UnitId>> {
    use petgraph::Direction;

    let mut in_degree: HashMap<NodeIndex, usize> = index_of
        .values()
        .map(|&idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut remaining: std::collections::HashSet<NodeIndex> = index_of.values().copied().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let mut frontier: Vec<NodeIndex> =
            remaining.iter().copied().filter(|idx| in_degree[idx] == 0).collect();
        // Deterministic ordering within a wave (scheduling may still run
        // them in any order, but the plan itself should be stable).
        frontier.sort_by_key(|idx| graph[*idx].as_str().to_string());

        for idx in &frontier {
            remaining.remove(idx);
            for next in graph.neighbors_directed(*idx, Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d = d.saturating_sub(1);
                }
            }
        }

        waves.push(frontier.iter().map(|idx| graph[*idx].clone()).collect());
    }

    waves
}

fn soft_dep_warnings(manifests: &HashMap<UnitId, Manifest>) -> Vec<ResolutionWarning> {
    let mut warnings = Vec::new();
    for manifest in manifests.values() {
        for soft_dep in &manifest.soft_deps {
            if !manifests.contains_key(soft_dep) {
                warnings.push(ResolutionWarning::MissingSoftDependency {
                    unit: manifest.id.clone(),
                    missing: soft_dep.clone(),
                });
            }
        }
    }
    warnings.sort_by_key(|w| w.to_string());
    warnings
}

/// DFS cycle reporting, ported from the recursive-stack walk used by the
/// original resolver: walk the hard-dep subgraph tracking the recursion
/// stack, and on hitting a node already on the stack, report the path from
/// that node back to itself.
fn find_cycle_path(manifests: &HashMap<UnitId, Manifest>) -> Vec<UnitId> {
    let mut visited: std::collections::HashSet<UnitId> = std::collections::HashSet::new();
    let mut stack: Vec<UnitId> = Vec::new();
    let mut on_stack: std::collections::HashSet<UnitId> = std::collections::HashSet::new();

    let mut ids: Vec<&UnitId> = manifests.keys().collect();
    ids.sort_by_key(|id| id.as_str());

    for start in ids {
        if visited.contains(start) {
            continue;
        }
        if let Some(cycle) = dfs(start.clone(), manifests, &mut visited, &mut stack, &mut on_stack) {
            return cycle;
        }
    }
    Vec::new()
}

fn dfs(
    node: UnitId,
    manifests: &HashMap<UnitId, Manifest>,
    visited: &mut std::collections::HashSet<UnitId>,
    stack: &mut Vec<UnitId>,
    on_stack: &mut std::collections::HashSet<UnitId>,
) -> Option<Vec<UnitId>> {
    visited.insert(node.clone());
    stack.push(node.clone());
    on_stack.insert(node.clone());

    if let Some(manifest) = manifests.get(&node) {
        for dep in &manifest.hard_deps {
            if !visited.contains(dep) {
                if let Some(cycle) = dfs(dep.clone(), manifests, visited, stack, on_stack) {
                    return Some(cycle);
                }
            } else if on_stack.contains(dep) {
                if let Some(start) = stack.iter().position(|n| n == dep) {
                    let mut cycle: Vec<UnitId> = stack[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    on_stack.remove(&node);
    None
}
