//! tiergraph command-line entry point.
//!
//! Exit codes: `0` when every node resolved, `2` when the run finished with
//! per-node failures, `1` for run-level errors.

use clap::Parser;
use std::process::ExitCode;
use tiergraph::cli;
use tiergraph::core::user_friendly_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            ExitCode::FAILURE
        }
    }
}
