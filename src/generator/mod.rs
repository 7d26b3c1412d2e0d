//! Output generators for a finished node graph.
//!
//! A [`Generator`] turns nodes into [`Artifact`]s (relative path + contents).
//! The driver only depends on the trait: it calls [`Generator::create_node`]
//! once per node, in include order when the graph is acyclic, then
//! [`Generator::finish`] once for whole-graph artifacts, and finally writes
//! everything with [`write_artifacts`].
//!
//! | Generator | Output |
//! |---|---|
//! | [`GraphJsonGenerator`] (`json`) | `graph.json`, the whole graph |
//! | [`StubGenerator`] (`stub`) | `<id>.json` config stub and `<id>.<ext>` template stub per node |

mod json;
mod stub;

pub use json::GraphJsonGenerator;
pub use stub::StubGenerator;

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::graph::{Node, NodeGraph};
use crate::utils::atomic_write_multiple;

/// One file produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the output directory
    pub relative_path: PathBuf,
    pub contents: String,
}

impl Artifact {
    #[must_use]
    pub fn new(relative_path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            contents: contents.into(),
        }
    }
}

/// Capability interface implemented by every output format.
pub trait Generator: Send + Sync {
    /// Short name used on the command line.
    fn name(&self) -> &'static str;

    /// Artifacts for one node.
    fn create_node(&self, node: &Node, graph: &NodeGraph) -> Result<Vec<Artifact>>;

    /// Artifacts describing the graph as a whole.
    fn finish(&self, _graph: &NodeGraph) -> Result<Vec<Artifact>> {
        Ok(Vec::new())
    }
}

/// Look up a built-in generator by its command-line name.
///
/// # Errors
///
/// Fails for an unknown name or if the generator cannot be built.
pub fn by_name(name: &str, extension: &str) -> Result<Box<dyn Generator>> {
    match name {
        "json" => Ok(Box::new(GraphJsonGenerator)),
        "stub" => Ok(Box::new(StubGenerator::new(extension)?)),
        other => Err(anyhow::anyhow!("Unknown generator '{other}' (expected json or stub)")),
    }
}

/// Run `generator` over every node of `graph`.
///
/// Nodes are visited with include targets before includers; if the graph has
/// an include cycle they are visited in id order instead.
///
/// # Errors
///
/// The first error returned by the generator, annotated with the node id.
pub fn generate(generator: &dyn Generator, graph: &NodeGraph) -> Result<Vec<Artifact>> {
    let order = graph.dependency_order().unwrap_or_else(|e| {
        tracing::debug!("{}; generating in id order", e);
        graph.ids().map(str::to_string).collect()
    });

    let mut artifacts = Vec::new();
    for id in &order {
        let Some(node) = graph.get_node(id) else {
            continue;
        };
        let produced = generator
            .create_node(node, graph)
            .with_context(|| format!("Generator '{}' failed for node '{}'", generator.name(), id))?;
        artifacts.extend(produced);
    }
    artifacts.extend(
        generator
            .finish(graph)
            .with_context(|| format!("Generator '{}' failed to finish", generator.name()))?,
    );

    tracing::debug!("Generator '{}' produced {} artifact(s)", generator.name(), artifacts.len());
    Ok(artifacts)
}

/// Write artifacts under `out_dir` atomically and return the written paths.
///
/// # Errors
///
/// Fails if an artifact path would escape `out_dir` or any write fails.
pub async fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let escapes = artifact
            .relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(anyhow::anyhow!(
                "Artifact path '{}' must stay inside the output directory",
                artifact.relative_path.display()
            ));
        }
        files.push((out_dir.join(&artifact.relative_path), artifact.contents.clone().into_bytes()));
    }

    let written: Vec<PathBuf> = files.iter().map(|(path, _)| path.clone()).collect();
    atomic_write_multiple(files).await?;
    tracing::info!("Wrote {} artifact(s) to {}", written.len(), out_dir.display());
    Ok(written)
}
