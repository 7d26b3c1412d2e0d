//! Test utilities for tiergraph
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] for opt-in tracing output in tests
//! - [`TemplateTree`] for building tiered template trees in a temp directory
//! - [`InstrumentedSource`] for injecting read delays and failures and
//!   counting reads per template
//!
//! # Example
//!
//! ```rust,no_run
//! use tiergraph::resolver::{DependencyResolver, Tier};
//! use tiergraph::test_utils::TemplateTree;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tree = TemplateTree::new()?;
//! tree.add(Tier::Small, "01-header.tmpl", "<h1>{{title}}</h1>")?;
//! let home = tree.add_start("home.tmpl", "{{> small-header}}")?;
//!
//! let resolution = DependencyResolver::new(tree.config().with_start_file(home)).resolve().await?;
//! assert!(resolution.graph().has_node("small-header"));
//! # Ok(())
//! # }
//! ```

mod fixtures;
mod source;

pub use fixtures::TemplateTree;
pub use source::InstrumentedSource;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialise tracing for tests, at most once per process.
///
/// With `Some(level)` that level is used; otherwise logging is enabled only
/// when `RUST_LOG` is set.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
