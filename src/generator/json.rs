//! Whole-graph JSON document.

use anyhow::{Context, Result};

use super::{Artifact, Generator};
use crate::constants::GRAPH_DOCUMENT_NAME;
use crate::graph::{Node, NodeGraph};

/// Serializes the entire graph, nodes in id order, into `graph.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphJsonGenerator;

impl Generator for GraphJsonGenerator {
    fn name(&self) -> &'static str {
        "json"
    }

    fn create_node(&self, _node: &Node, _graph: &NodeGraph) -> Result<Vec<Artifact>> {
        Ok(Vec::new())
    }

    fn finish(&self, graph: &NodeGraph) -> Result<Vec<Artifact>> {
        let mut document = serde_json::to_string_pretty(graph).context("Failed to serialize graph")?;
        document.push('\n');
        Ok(vec![Artifact::new(GRAPH_DOCUMENT_NAME, document)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::graph::Field;

    #[test]
    fn test_single_document() {
        let mut graph = NodeGraph::default();
        graph.add_node("small-b").unwrap();
        graph.add_node("small-a").unwrap();
        graph.add_field("small-a", Field::iterable("rows")).unwrap();

        let artifacts = generate(&GraphJsonGenerator, &graph).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].relative_path.to_str(), Some("graph.json"));

        let value: serde_json::Value = serde_json::from_str(&artifacts[0].contents).unwrap();
        let ids: Vec<_> = value["nodes"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(ids, vec!["small-a", "small-b"]);
        assert_eq!(value["nodes"]["small-a"]["fields"][0]["iterable"], true);
    }
}
