//! Command-line interface for tiergraph.
//!
//! # Commands
//!
//! - `resolve` - resolve a template tree into a node graph, print it, and
//!   optionally write generator output
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - configuration file (default: `./tiergraph.toml` if present)
//!
//! Without `--verbose` or `--quiet` the log filter comes from `RUST_LOG`,
//! falling back to warnings. Logs go to stderr; command output to stdout.

mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub use resolve::{GeneratorKind, OutputFormat, ResolveCommand};

/// Main CLI structure for tiergraph.
#[derive(Parser, Debug)]
#[command(
    name = "tiergraph",
    about = "Resolve tiered template trees into a dependency graph",
    version,
    long_about = "tiergraph scans small/medium/large template tiers, follows includes from the \
                  given start templates, and reports the resulting graph of nodes, fields, and relations."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a tiergraph.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve templates into a node graph
    Resolve(ResolveCommand),
}

impl Cli {
    /// Initialise logging and run the selected command.
    ///
    /// # Errors
    ///
    /// Configuration, scan, and integrity errors, plus any failure writing output.
    pub async fn execute(self) -> Result<ExitCode> {
        self.init_logging();
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(self.config.as_deref()).await,
        }
    }

    fn log_filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }

    fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}
