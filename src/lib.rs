//! tiergraph - hierarchical template dependency resolver
//!
//! tiergraph turns a tree of Mustache-style templates, organised into three
//! naming tiers (small, medium, large), into a directed graph of content
//! nodes. Each node carries the fields its template references and the
//! relations (includes) it makes to other nodes. The finished graph is handed
//! to pluggable generators that write output artifacts.
//!
//! # Architecture Overview
//!
//! ```text
//!  tier dirs ──scan──► PathResolver ──┐
//!                                      ▼
//!  start templates ──► DependencyResolver ◄── ParseEvents ◄── TemplateParser ◄── Lexer
//!                                      │        (one tokio task per template)
//!                                      ▼
//!                                  NodeGraph ──► Generators ──► artifacts
//! ```
//!
//! Templates are discovered on demand. Parses run concurrently; the resolver
//! applies their events to the graph, launches a parse for every newly seen
//! include, and finishes once the outstanding work has provably quiesced.
//!
//! # Core Modules
//!
//! - [`template`] - token lexer, `@import`/`@node` annotations, event-emitting parser
//! - [`graph`] - node graph store with strict or lenient identity policy
//! - [`resolver`] - path resolver, quiescence tracking, and the orchestrator
//! - [`generator`] - generator trait, JSON and stub generators
//!
//! ## Supporting Modules
//!
//! - [`config`] - `tiergraph.toml` configuration
//! - [`core`] - error taxonomy and user-facing error reporting
//! - [`cli`] - the `tiergraph` command line
//! - [`utils`] - atomic file writes
//!
//! # Template Layout
//!
//! ```text
//! templates/
//! ├── small/01-header.tmpl     → small-header
//! ├── medium/10-card.tmpl      → medium-card
//! ├── large/page.tmpl          → large-page
//! └── pages/home.tmpl          (start template)
//! ```
//!
//! ```text
//! {{! @import {"name": "footerHeader"} }}
//! {{> small-header}}
//! {{#items}}{{label}}{{/items}}
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Print a summary of the graph
//! tiergraph resolve --root templates --start-file templates/pages/home.tmpl
//!
//! # Resolve every page and write graph.json plus per-node stubs
//! tiergraph resolve --root templates --start-dir templates/pages \
//!     --out build --generator json --generator stub
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod generator;
pub mod graph;
pub mod resolver;
pub mod template;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
