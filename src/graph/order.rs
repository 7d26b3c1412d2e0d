//! Include ordering over a finished graph.
//!
//! Resolution tolerates include cycles (deduplication stops the recursion),
//! but generators that emit one artifact per node may need every include
//! target before its includer. This module projects the resolved relations
//! onto a petgraph [`DiGraph`] for that.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::NodeGraph;
use crate::core::TierGraphError;

impl NodeGraph {
    /// Build a directed graph with one edge per distinct resolved include.
    fn include_graph(&self) -> DiGraph<&str, ()> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for id in self.ids() {
            index.insert(id, graph.add_node(id));
        }

        for node in self.nodes() {
            let from = index[node.id.as_str()];
            for relation in node.relations.iter().filter(|r| r.resolved) {
                if let Some(&to) = index.get(relation.target.as_str())
                    && !graph.contains_edge(from, to)
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        graph
    }

    /// Node ids ordered so that every include target precedes its includers.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::CircularInclude`] naming one cycle if the resolved
    /// relations are not acyclic.
    pub fn dependency_order(&self) -> Result<Vec<String>, TierGraphError> {
        let graph = self.include_graph();

        match toposort(&graph, None) {
            // toposort puts includers first; reverse so targets come first
            Ok(indices) => Ok(indices.into_iter().rev().map(|idx| graph[idx].to_string()).collect()),
            Err(_) => {
                let chain = self
                    .cycles()
                    .into_iter()
                    .next()
                    .map(|mut cycle| {
                        if let Some(first) = cycle.first().cloned() {
                            cycle.push(first);
                        }
                        cycle.join(" → ")
                    })
                    .unwrap_or_default();
                Err(TierGraphError::CircularInclude {
                    chain,
                })
            }
        }
    }

    /// Every include cycle, each as a sorted list of node ids.
    ///
    /// Self-includes count as cycles of length one.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let graph = self.include_graph();

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component.first().is_some_and(|&idx| graph.contains_edge(idx, idx))
            })
            .map(|component| {
                let mut ids: Vec<String> =
                    component.into_iter().map(|idx| graph[idx].to_string()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}
