//! Resolver configuration.
//!
//! A run is described by a [`ResolverConfig`], usually loaded from a
//! `tiergraph.toml` next to the template tree and then overridden by CLI flags:
//!
//! ```toml
//! root = "templates"
//! extension = "tmpl"
//! start_file = "templates/pages/home.tmpl"
//! root_name = "home"
//! policy = "lenient"
//!
//! [tiers]
//! small = "atoms"
//! medium = "molecules"
//! large = "organisms"
//! ```
//!
//! Relative paths in a config file are resolved against the directory that
//! contains the file. Every key is optional; unknown keys are rejected.

mod parser;

pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_EXTENSION;
use crate::core::TierGraphError;
use crate::graph::IdentityPolicy;
use crate::resolver::path_resolver::Tier;

/// Directory name of each tier, relative to the template root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierDirectories {
    pub small: String,
    pub medium: String,
    pub large: String,
}

impl Default for TierDirectories {
    fn default() -> Self {
        Self {
            small: Tier::Small.as_str().to_string(),
            medium: Tier::Medium.as_str().to_string(),
            large: Tier::Large.as_str().to_string(),
        }
    }
}

impl TierDirectories {
    #[must_use]
    pub fn dir(&self, tier: Tier) -> &str {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::Large => &self.large,
        }
    }
}

/// Where a run starts parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPoint {
    /// A single template
    File(PathBuf),
    /// Every template directly inside a directory
    Directory(PathBuf),
}

/// Everything a resolution run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Directory holding the three tier directories
    pub root: PathBuf,
    /// Template file extension, with or without the leading dot
    pub extension: String,
    pub tiers: TierDirectories,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file: Option<PathBuf>,
    /// Takes precedence over `start_file` when both are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_dir: Option<PathBuf>,
    /// Node id for a start file that is not itself a tier template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_name: Option<String>,
    pub policy: IdentityPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            tiers: TierDirectories::default(),
            start_file: None,
            start_dir: None,
            root_name: None,
            policy: IdentityPolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Configuration for the template tree under `root`, with no start point yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load a config file, resolving relative paths against its directory.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid config.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Self = parse_config(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.root = base.join(&config.root);
        config.start_file = config.start_file.map(|p| base.join(p));
        config.start_dir = config.start_dir.map(|p| base.join(p));
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub fn with_start_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.start_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_start_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: IdentityPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_tiers(mut self, tiers: TierDirectories) -> Self {
        self.tiers = tiers;
        self
    }

    /// The configured start point; a start directory wins over a start file.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::ConfigurationError`] if neither is set, or the
    /// extension is empty.
    pub fn start_point(&self) -> Result<StartPoint, TierGraphError> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(TierGraphError::ConfigurationError {
                message: "template extension must not be empty".to_string(),
            });
        }
        match (&self.start_dir, &self.start_file) {
            (Some(dir), file) => {
                if file.is_some() {
                    tracing::debug!("Both start_dir and start_file set; using start_dir");
                }
                Ok(StartPoint::Directory(dir.clone()))
            }
            (None, Some(file)) => Ok(StartPoint::File(file.clone())),
            (None, None) => Err(TierGraphError::ConfigurationError {
                message: "neither a start file nor a start directory was given".to_string(),
            }),
        }
    }
}
