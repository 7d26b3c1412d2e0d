//! Integration test suite for tiergraph
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolve**: library-level resolution over realistic template trees
//! - **cli**: the `tiergraph resolve` command, output formats, exit codes

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod resolve;
