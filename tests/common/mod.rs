//! Common fixtures for tiergraph integration tests

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::PathBuf;
use tiergraph::resolver::Tier;
use tiergraph::test_utils::TemplateTree;

/// A small marketing site: two pages sharing a card grid and a header.
///
/// ```text
/// pages/01-home.tmpl   → large-layout, medium-card (as "hero")
/// pages/02-about.tmpl  → large-layout
/// large/layout.tmpl    → small-header, small-header (as "footerHeader"), medium-card-grid
/// medium/card-grid     → medium-card
/// medium/card          → small-icon (inline)
/// ```
pub fn site() -> Result<TemplateTree> {
    let tree = TemplateTree::new()?;
    tree.add(Tier::Small, "01-header.tmpl", "<header><h1>{{title}}</h1>{{subtitle}}</header>")?;
    tree.add(
        Tier::Small,
        "icons/02-icon.tmpl",
        "{{! @node {\"inline\": true} }}<i class=\"{{glyph}}\"></i>",
    )?;
    tree.add(
        Tier::Medium,
        "10-card.tmpl",
        "<article>{{> small-icon}}<h2>{{heading}}</h2>{{#tags}}<span>{{.}}</span>{{/tags}}</article>",
    )?;
    tree.add(
        Tier::Medium,
        "20-card-grid.tmpl",
        "{{! @import {\"min\": 1} }}{{#cards}}{{> medium-card}}{{/cards}}",
    )?;
    tree.add(
        Tier::Large,
        "layout.tmpl",
        concat!(
            "{{> small-header}}\n",
            "<main>{{{body}}}</main>\n",
            "{{> medium-card-grid}}\n",
            "{{! @import {\"name\": \"footerHeader\"} }}\n",
            "<footer>{{> small-header}}</footer>\n",
        ),
    )?;
    tree.add_start(
        "01-home.tmpl",
        "{{> large-layout}}{{! @import {\"name\": \"hero\"} }}{{> medium-card}}",
    )?;
    tree.add_start("02-about.tmpl", "{{> large-layout}}{{team}}")?;
    Ok(tree)
}

/// Path of a start template in `tree`.
pub fn page(tree: &TemplateTree, file: &str) -> PathBuf {
    tree.pages_dir().join(file)
}

/// The tiergraph binary with logging turned down and no ambient config.
pub fn tiergraph(tree: &TemplateTree) -> Command {
    let mut cmd = Command::cargo_bin("tiergraph").expect("tiergraph binary is built");
    cmd.current_dir(tree.root()).env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}
