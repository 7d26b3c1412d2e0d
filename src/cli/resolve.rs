//! `tiergraph resolve`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::ResolverConfig;
use crate::constants::CONFIG_FILE_NAME;
use crate::generator;
use crate::graph::{IdentityPolicy, NodeStatus};
use crate::resolver::{DependencyResolver, Resolution};

/// Exit code for a run that finished with per-node failures.
const PARTIAL_FAILURE_EXIT: u8 = 2;

/// How the graph is printed to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Node table, failures, and fingerprint
    #[default]
    Summary,
    /// The graph as a JSON document
    Json,
}

/// Generators that can write into `--out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GeneratorKind {
    /// graph.json with the whole graph
    Json,
    /// Config and template stubs per node
    Stub,
}

impl GeneratorKind {
    /// Name understood by [`generator::by_name`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Stub => "stub",
        }
    }
}

/// Resolve a template tree.
#[derive(Args, Debug, Default)]
pub struct ResolveCommand {
    /// Template root containing the tier directories
    #[arg(long)]
    root: Option<PathBuf>,

    /// Start from a single template
    #[arg(long)]
    start_file: Option<PathBuf>,

    /// Start from every template in a directory (wins over --start-file)
    #[arg(long)]
    start_dir: Option<PathBuf>,

    /// Template file extension
    #[arg(long = "ext")]
    extension: Option<String>,

    /// Node id for a start file outside the tiers
    #[arg(long)]
    root_name: Option<String>,

    /// Reject duplicate nodes and duplicate field names
    #[arg(long)]
    strict: bool,

    /// Output format for stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,

    /// Directory to write generator artifacts into
    #[arg(long)]
    out: Option<PathBuf>,

    /// Generator to run (repeatable; defaults to json when --out is set)
    #[arg(long = "generator", value_enum, requires = "out")]
    generators: Vec<GeneratorKind>,
}

impl ResolveCommand {
    /// Resolve, print, and write generator output.
    ///
    /// Returns exit code 2 when some nodes failed.
    ///
    /// # Errors
    ///
    /// Run-level resolution errors and output failures.
    pub async fn execute(self, config_path: Option<&Path>) -> Result<ExitCode> {
        let config = self.build_config(config_path)?;
        let extension = config.extension.clone();

        let resolution = DependencyResolver::new(config).resolve().await?;

        match self.format {
            OutputFormat::Summary => print!("{}", render_summary(&resolution)?),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(resolution.graph()).context("Failed to serialize graph")?
            ),
        }

        if let Some(out) = &self.out {
            self.write_output(out, &resolution, &extension).await?;
        }

        if resolution.is_complete() {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::from(PARTIAL_FAILURE_EXIT))
        }
    }

    /// Configuration file values overridden by command-line flags.
    fn build_config(&self, config_path: Option<&Path>) -> Result<ResolverConfig> {
        let default_path = Path::new(CONFIG_FILE_NAME);
        let mut config = match config_path {
            Some(path) => ResolverConfig::load(path)?,
            None if default_path.is_file() => ResolverConfig::load(default_path)?,
            None => ResolverConfig::default(),
        };

        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        if self.start_file.is_some() || self.start_dir.is_some() {
            config.start_file.clone_from(&self.start_file);
            config.start_dir.clone_from(&self.start_dir);
        }
        if let Some(extension) = &self.extension {
            config.extension.clone_from(extension);
        }
        if let Some(name) = &self.root_name {
            config.root_name = Some(name.clone());
        }
        if self.strict {
            config.policy = IdentityPolicy::Strict;
        }

        tracing::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    async fn write_output(&self, out: &Path, resolution: &Resolution, extension: &str) -> Result<()> {
        let kinds = if self.generators.is_empty() {
            vec![GeneratorKind::Json]
        } else {
            self.generators.clone()
        };

        for kind in kinds {
            let generator = generator::by_name(kind.name(), extension)?;
            let artifacts = generator::generate(generator.as_ref(), resolution.graph())?;
            generator::write_artifacts(out, &artifacts).await?;
        }
        Ok(())
    }
}

/// Human-readable report of a resolution.
fn render_summary(resolution: &Resolution) -> Result<String> {
    let graph = resolution.graph();
    let mut out = String::new();

    writeln!(
        out,
        "Resolved {} node(s) from {} start template(s)",
        graph.len(),
        resolution.start_nodes().len()
    )?;

    let width = graph.ids().map(str::len).max().unwrap_or(0);
    for node in graph.nodes() {
        let status = match node.status {
            NodeStatus::Parsed => "parsed".green(),
            NodeStatus::Pending => "pending".yellow(),
            NodeStatus::Failed => "failed".red(),
            NodeStatus::Unresolved => "unresolved".red(),
        };
        let inline = if node.is_inline() { " (inline)" } else { "" };
        writeln!(
            out,
            "  {:<width$}  {:<10}  {} field(s), {} relation(s){}",
            node.id,
            status,
            node.fields.len(),
            node.relations.len(),
            inline
        )?;
    }

    if !resolution.failures().is_empty() {
        writeln!(out, "\n{}", "Failures:".red().bold())?;
        for failure in resolution.failures() {
            writeln!(out, "  {}: {}", failure.node, failure.error)?;
        }
    }

    if !resolution.warnings().is_empty() {
        writeln!(out, "\n{}", "Warnings:".yellow().bold())?;
        for warning in resolution.warnings() {
            writeln!(out, "  {warning}")?;
        }
    }

    writeln!(out, "\nfingerprint: {}", resolution.fingerprint()?)?;
    Ok(out)
}
