//! Per-node config and template stubs.
//!
//! For every parsed, non-inlined node this generator writes:
//! - `<id>.json`: one key per distinct field name; iterable fields default to
//!   `[]`, all others to `""`
//! - `<id>.<ext>`: a skeleton template referencing the same fields and
//!   includes, rendered through tera

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use tera::{Context as TeraContext, Tera};

use super::{Artifact, Generator};
use crate::constants::{DEFAULT_CLOSE_DELIMITER, DEFAULT_OPEN_DELIMITER, IMPORT_TAG};
use crate::graph::{Node, NodeGraph, NodeStatus};
use crate::resolver::path_resolver::normalize_extension;

const STUB_TEMPLATE_NAME: &str = "stub";

/// Skeleton template. Mustache delimiters come from the context so tera does
/// not interpret them.
const STUB_TEMPLATE: &str = r"{{ open }}! {{ id }} {{ close }}
{% for field in fields -%}
{% if field.iterable -%}
{{ open }}#{{ field.name }}{{ close }}{{ open }}/{{ field.name }}{{ close }}
{% else -%}
{{ open }}{{ field.name }}{{ close }}
{% endif -%}
{% endfor -%}
{% for relation in relations -%}
{% if relation.annotation -%}
{{ open }}! {{ tag }} {{ relation.annotation }} {{ close }}
{% endif -%}
{{ open }}> {{ relation.target }}{{ close }}
{% endfor -%}
";

#[derive(Serialize)]
struct StubField<'a> {
    name: &'a str,
    iterable: bool,
}

#[derive(Serialize)]
struct StubRelation<'a> {
    target: &'a str,
    /// Import annotation JSON, only when the display name differs from the target
    annotation: Option<String>,
}

/// Writes a config stub and a template stub per node.
#[derive(Debug)]
pub struct StubGenerator {
    tera: Tera,
    extension: String,
}

impl StubGenerator {
    /// Build a generator writing template stubs with `extension`.
    ///
    /// # Errors
    ///
    /// Fails if the built-in stub template does not compile.
    pub fn new(extension: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(STUB_TEMPLATE_NAME, STUB_TEMPLATE)
            .context("Failed to compile stub template")?;
        Ok(Self {
            tera,
            extension: normalize_extension(extension).to_string(),
        })
    }

    fn config_stub(node: &Node) -> Result<String> {
        let mut config = Map::new();
        for field in &node.fields {
            if config.contains_key(&field.name) {
                continue;
            }
            let default = if field.iterable { json!([]) } else { json!("") };
            config.insert(field.name.clone(), default);
        }
        let mut contents = serde_json::to_string_pretty(&Value::Object(config))?;
        contents.push('\n');
        Ok(contents)
    }

    fn template_stub(&self, node: &Node) -> Result<String> {
        let mut seen = HashSet::new();
        let fields: Vec<StubField<'_>> = node
            .fields
            .iter()
            .filter(|f| seen.insert(f.name.as_str()))
            .map(|f| StubField {
                name: &f.name,
                iterable: f.iterable,
            })
            .collect();

        let relations = node
            .relations
            .iter()
            .map(|r| -> Result<StubRelation<'_>> {
                let annotation = if r.display_name() == r.target {
                    None
                } else {
                    Some(serde_json::to_string(&json!({ "name": r.display_name() }))?)
                };
                Ok(StubRelation {
                    target: &r.target,
                    annotation,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut context = TeraContext::new();
        context.insert("open", DEFAULT_OPEN_DELIMITER);
        context.insert("close", DEFAULT_CLOSE_DELIMITER);
        context.insert("tag", IMPORT_TAG);
        context.insert("id", &node.id);
        context.insert("fields", &fields);
        context.insert("relations", &relations);

        self.tera
            .render(STUB_TEMPLATE_NAME, &context)
            .with_context(|| format!("Failed to render stub template for '{}'", node.id))
    }
}

impl Generator for StubGenerator {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn create_node(&self, node: &Node, _graph: &NodeGraph) -> Result<Vec<Artifact>> {
        if node.is_inline() || node.status == NodeStatus::Unresolved {
            tracing::debug!("No stub for '{}'", node.id);
            return Ok(Vec::new());
        }
        Ok(vec![
            Artifact::new(format!("{}.json", node.id), Self::config_stub(node)?),
            Artifact::new(format!("{}.{}", node.id, self.extension), self.template_stub(node)?),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Field, Relation};
    use crate::template::{AnnotationBlock, AnnotationKind, ParseEvent, parse_str};

    fn card_graph() -> NodeGraph {
        let mut graph = NodeGraph::default();
        graph.add_node("medium-card").unwrap();
        graph.add_field("medium-card", Field::scalar("title")).unwrap();
        graph.add_field("medium-card", Field::iterable("tags")).unwrap();
        graph.add_field("medium-card", Field::scalar("title")).unwrap();
        graph
            .add_relation("medium-card", Relation::new("small-icon", AnnotationBlock::import("small-icon")))
            .unwrap();
        graph
            .add_relation("medium-card", Relation::new("small-icon", AnnotationBlock::import("badge")))
            .unwrap();
        graph
    }

    #[test]
    fn test_config_stub_defaults() {
        let graph = card_graph();
        let generator = StubGenerator::new(".tmpl").unwrap();
        let artifacts = generator.create_node(graph.get_node("medium-card").unwrap(), &graph).unwrap();

        assert_eq!(artifacts[0].relative_path.to_str(), Some("medium-card.json"));
        let config: Value = serde_json::from_str(&artifacts[0].contents).unwrap();
        assert_eq!(config, json!({ "title": "", "tags": [] }));
        assert_eq!(artifacts[1].relative_path.to_str(), Some("medium-card.tmpl"));
    }

    #[test]
    fn test_template_stub_parses_back_to_the_same_shape() {
        let graph = card_graph();
        let generator = StubGenerator::new("tmpl").unwrap();
        let artifacts = generator.create_node(graph.get_node("medium-card").unwrap(), &graph).unwrap();

        let mut events = Vec::new();
        parse_str(&artifacts[1].contents, &mut events);

        let fields: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Field(f) => Some((f.name.as_str(), f.iterable)),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec![("title", false), ("tags", true)]);

        let includes: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Include { target, annotation } => {
                    Some((target.as_str(), annotation.display_name().unwrap_or_default()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(includes, vec![("small-icon", "small-icon"), ("small-icon", "badge")]);
        assert_eq!(events.last(), Some(&ParseEvent::Done));
    }

    #[test]
    fn test_inline_and_unresolved_nodes_are_skipped() {
        let mut graph = NodeGraph::default();
        graph.add_node("small-icon").unwrap();
        let mut meta = AnnotationBlock::new(AnnotationKind::NodeMeta);
        meta.options.insert("inline".to_string(), json!(true));
        graph.add_meta("small-icon", &meta).unwrap();
        graph.add_node("small-gone").unwrap();
        graph.set_status("small-gone", NodeStatus::Unresolved).unwrap();

        let generator = StubGenerator::new("tmpl").unwrap();
        for node in graph.nodes() {
            assert!(generator.create_node(node, &graph).unwrap().is_empty());
        }
    }
}
