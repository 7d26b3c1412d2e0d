//! End-to-end resolution through the public library API.

use crate::common::{page, site};
use tiergraph::config::ResolverConfig;
use tiergraph::generator::{self, GraphJsonGenerator, StubGenerator};
use tiergraph::graph::{Field, IdentityPolicy, NodeStatus};
use tiergraph::resolver::{DependencyResolver, RunState, Tier};
use tiergraph::test_utils::init_test_logging;

fn relations(graph: &tiergraph::graph::NodeGraph, id: &str) -> Vec<(String, String)> {
    graph
        .get_node(id)
        .unwrap()
        .relations
        .iter()
        .map(|r| (r.target.clone(), r.display_name().to_string()))
        .collect()
}

#[tokio::test]
async fn test_site_from_start_dir() {
    init_test_logging(None);
    let tree = site().unwrap();

    let resolution = DependencyResolver::new(tree.config().with_start_dir(tree.pages_dir()))
        .resolve()
        .await
        .unwrap();
    let graph = resolution.graph();

    assert!(resolution.is_complete());
    assert_eq!(resolution.state(), RunState::Done);
    assert_eq!(resolution.start_nodes(), ["home", "about"]);
    assert_eq!(
        graph.ids().collect::<Vec<_>>(),
        vec![
            "about",
            "home",
            "large-layout",
            "medium-card",
            "medium-card-grid",
            "small-header",
            "small-icon"
        ]
    );
    assert!(graph.nodes().all(|n| n.status == NodeStatus::Parsed));

    assert_eq!(
        relations(graph, "home"),
        vec![
            ("large-layout".to_string(), "large-layout".to_string()),
            ("medium-card".to_string(), "hero".to_string()),
        ]
    );
    assert_eq!(
        relations(graph, "large-layout"),
        vec![
            ("small-header".to_string(), "small-header".to_string()),
            ("medium-card-grid".to_string(), "medium-card-grid".to_string()),
            ("small-header".to_string(), "footerHeader".to_string()),
        ]
    );

    let header = graph.get_node("small-header").unwrap();
    assert_eq!(header.fields, vec![Field::scalar("title"), Field::scalar("subtitle")]);

    let card = graph.get_node("medium-card").unwrap();
    let card_fields: Vec<_> = card.fields.iter().map(|f| (f.name.as_str(), f.iterable)).collect();
    assert_eq!(card_fields, vec![("heading", false), ("tags", true)]);

    assert!(graph.get_node("small-icon").unwrap().is_inline());
    // One entry per relation: the layout includes the header twice
    assert_eq!(graph.includers_of("small-header"), vec!["large-layout", "large-layout"]);
}

#[tokio::test]
async fn test_single_start_file_only_reaches_its_includes() {
    let tree = site().unwrap();

    let config = tree.config().with_start_file(page(&tree, "02-about.tmpl"));
    let resolution = DependencyResolver::new(config).resolve().await.unwrap();
    let graph = resolution.graph();

    assert_eq!(resolution.start_nodes(), ["about"]);
    assert!(graph.has_node("large-layout"));
    assert!(!graph.has_node("home"));
    assert_eq!(graph.get_node("about").unwrap().fields, vec![Field::scalar("team")]);
}

#[tokio::test]
async fn test_missing_template_is_contained() {
    let tree = site().unwrap();
    tree.remove(Tier::Small, "icons/02-icon.tmpl").unwrap();

    let config = tree.config().with_start_dir(tree.pages_dir());
    let resolution = DependencyResolver::new(config).resolve().await.unwrap();
    let graph = resolution.graph();

    assert!(!resolution.is_complete());
    assert_eq!(graph.get_node("small-icon").unwrap().status, NodeStatus::Unresolved);
    assert_eq!(graph.get_node("medium-card").unwrap().status, NodeStatus::Failed);
    // The includer keeps what it parsed
    assert_eq!(graph.get_node("medium-card").unwrap().fields.len(), 2);
    assert_eq!(graph.get_node("large-layout").unwrap().status, NodeStatus::Parsed);
    assert_eq!(resolution.failures_for("medium-card").count(), 1);
}

#[tokio::test]
async fn test_fingerprint_is_stable_across_runs() {
    let tree = site().unwrap();
    let config = tree.config().with_start_dir(tree.pages_dir());

    let first = DependencyResolver::new(config.clone()).resolve().await.unwrap();
    let second = DependencyResolver::new(config).resolve().await.unwrap();

    assert_eq!(first.graph(), second.graph());
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
}

#[tokio::test]
async fn test_generators_write_to_out_dir() {
    let tree = site().unwrap();
    let out = tempfile::tempdir().unwrap();
    let resolution = DependencyResolver::new(tree.config().with_start_dir(tree.pages_dir()))
        .resolve()
        .await
        .unwrap();

    let json = generator::generate(&GraphJsonGenerator, resolution.graph()).unwrap();
    generator::write_artifacts(out.path(), &json).await.unwrap();
    let stub = StubGenerator::new("tmpl").unwrap();
    let stubs = generator::generate(&stub, resolution.graph()).unwrap();
    let written = generator::write_artifacts(out.path(), &stubs).await.unwrap();

    // Six non-inline nodes, two files each
    assert_eq!(written.len(), 12);
    assert!(!out.path().join("small-icon.json").exists());

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("graph.json")).unwrap()).unwrap();
    assert_eq!(document["nodes"]["medium-card-grid"]["fields"][0]["name"], "cards");

    let config: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("small-header.json")).unwrap()).unwrap();
    assert_eq!(config, serde_json::json!({ "title": "", "subtitle": "" }));

    let layout = std::fs::read_to_string(out.path().join("large-layout.tmpl")).unwrap();
    assert!(layout.contains("{{> medium-card-grid}}"));
    assert!(layout.contains(r#"{{! @import {"name":"footerHeader"} }}"#));
}

#[tokio::test]
async fn test_config_file_drives_resolution() {
    let tree = site().unwrap();
    let config_path = tree.root().join("tiergraph.toml");
    std::fs::write(
        &config_path,
        "root = \".\"\nstart_file = \"pages/01-home.tmpl\"\nroot_name = \"index\"\npolicy = \"strict\"\n",
    )
    .unwrap();

    let config = ResolverConfig::load(&config_path).unwrap();
    assert_eq!(config.policy, IdentityPolicy::Strict);

    let resolution = DependencyResolver::new(config).resolve().await.unwrap();
    assert_eq!(resolution.start_nodes(), ["index"]);
    assert!(resolution.graph().has_node("medium-card-grid"));
    assert!(resolution.is_complete());
}
