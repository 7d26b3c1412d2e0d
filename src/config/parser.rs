//! Generic TOML configuration parsing.
//!
//! ```rust,no_run
//! use tiergraph::config::parse_config;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     root: String,
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let settings: Settings = parse_config(Path::new("tiergraph.toml"))?;
//! println!("Templates under {}", settings.root);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML configuration file into `T`.
///
/// # Errors
///
/// Fails if the file cannot be read or does not deserialize into `T`; the
/// error names the file and keeps the underlying I/O or TOML error as its cause.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
