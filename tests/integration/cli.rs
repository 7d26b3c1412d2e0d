//! The `tiergraph resolve` command.

use crate::common::{site, tiergraph};
use predicates::prelude::*;
use tiergraph::resolver::Tier;

#[test]
fn test_summary_for_start_dir() {
    let tree = site().unwrap();

    tiergraph(&tree)
        .args(["resolve", "--start-dir", "pages"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Resolved 7 node(s) from 2 start template(s)"))
        .stdout(predicate::str::contains("medium-card-grid"))
        .stdout(predicate::str::contains("(inline)"))
        .stdout(predicate::str::contains("fingerprint: sha256:"))
        .stdout(predicate::str::contains("Failures:").not());
}

#[test]
fn test_json_format_is_the_graph() {
    let tree = site().unwrap();

    let output = tiergraph(&tree)
        .args(["resolve", "--start-file", "pages/02-about.tmpl", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(graph["nodes"]["about"]["fields"][0]["name"], "team");
    assert!(graph["nodes"].get("home").is_none());
}

#[test]
fn test_missing_include_exits_with_partial_failure() {
    let tree = site().unwrap();
    tree.remove(Tier::Medium, "20-card-grid.tmpl").unwrap();

    tiergraph(&tree)
        .args(["resolve", "--start-dir", "pages"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Failures:"))
        .stdout(predicate::str::contains("medium-card-grid"));
}

#[test]
fn test_no_start_point_is_an_error() {
    let tree = site().unwrap();

    tiergraph(&tree)
        .arg("resolve")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("neither a start file nor a start directory"));
}

#[test]
fn test_missing_tier_directory_is_an_error() {
    let tree = site().unwrap();
    std::fs::remove_dir_all(tree.root().join("large")).unwrap();

    tiergraph(&tree).args(["resolve", "--start-dir", "pages"]).assert().code(1);
}

#[test]
fn test_generators_write_out_dir() {
    let tree = site().unwrap();
    let out = tree.root().join("build");

    tiergraph(&tree)
        .args(["-q", "resolve", "--start-dir", "pages", "--out", "build"])
        .args(["--generator", "json", "--generator", "stub"])
        .assert()
        .success();

    assert!(out.join("graph.json").is_file());
    assert!(out.join("large-layout.tmpl").is_file());
    assert!(out.join("medium-card.json").is_file());
    assert!(!out.join("small-icon.tmpl").exists());
}

#[test]
fn test_out_defaults_to_json_generator() {
    let tree = site().unwrap();

    tiergraph(&tree)
        .args(["resolve", "--start-dir", "pages", "--out", "build"])
        .assert()
        .success();

    assert!(tree.root().join("build/graph.json").is_file());
    assert!(!tree.root().join("build/home.json").exists());
}

#[test]
fn test_config_file_and_flag_override() {
    let tree = site().unwrap();
    std::fs::write(
        tree.root().join("tiergraph.toml"),
        "start_file = \"pages/01-home.tmpl\"\nroot_name = \"index\"\n",
    )
    .unwrap();

    // Picked up from the working directory
    tiergraph(&tree)
        .args(["resolve", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"index\""));

    // Start flags replace the configured start point; root_name only names a single start file
    tiergraph(&tree)
        .args(["resolve", "--start-dir", "pages", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"about\""))
        .stdout(predicate::str::contains("\"home\""))
        .stdout(predicate::str::contains("\"index\"").not());
}

#[test]
fn test_explicit_config_path() {
    let tree = site().unwrap();
    let config = tree.root().join("site.toml");
    std::fs::write(&config, "start_dir = \"pages\"\nextension = \"html\"\n").unwrap();

    // No .html templates in pages/, so nothing to resolve
    tiergraph(&tree)
        .args(["--config", "site.toml", "resolve"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Resolved 0 node(s) from 0 start template(s)"));
}
