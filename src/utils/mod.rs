//! Filesystem helpers used when writing generator output.
//!
//! # Example
//!
//! ```rust,no_run
//! use tiergraph::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("out/stubs"))?;
//! atomic_write(Path::new("out/stubs/small-header.json"), b"{}")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;

pub use fs::{atomic_write, atomic_write_multiple, ensure_dir};
