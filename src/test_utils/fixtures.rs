//! Template tree fixtures.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::ResolverConfig;
use crate::resolver::Tier;

/// Directory (relative to the tree root) that holds start templates.
const PAGES_DIR: &str = "pages";

/// A temporary template root with `small/`, `medium/`, `large/`, and `pages/`.
///
/// The directory is deleted when the tree is dropped.
#[derive(Debug)]
pub struct TemplateTree {
    temp: TempDir,
}

impl TemplateTree {
    /// Create an empty tree with all three tier directories.
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("Failed to create temp dir for template tree")?;
        for tier in Tier::ALL {
            fs::create_dir_all(temp.path().join(tier.as_str()))?;
        }
        fs::create_dir_all(temp.path().join(PAGES_DIR))?;
        Ok(Self { temp })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Directory that start templates are written to.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.root().join(PAGES_DIR)
    }

    /// Write a template into a tier; `file` may contain subdirectories.
    pub fn add(&self, tier: Tier, file: &str, contents: &str) -> Result<PathBuf> {
        self.write(&self.root().join(tier.as_str()).join(file), contents)
    }

    /// Write a start template into `pages/`.
    pub fn add_start(&self, file: &str, contents: &str) -> Result<PathBuf> {
        self.write(&self.pages_dir().join(file), contents)
    }

    /// Remove a template written earlier.
    pub fn remove(&self, tier: Tier, file: &str) -> Result<()> {
        let path = self.root().join(tier.as_str()).join(file);
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))
    }

    /// Resolver configuration rooted at this tree, with no start point.
    #[must_use]
    pub fn config(&self) -> ResolverConfig {
        ResolverConfig::new(self.root())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}
