//! Error handling for tiergraph
//!
//! This module provides the error taxonomy of a resolution run and the
//! user-friendly reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** ([`TierGraphError`]) so callers can tell a
//!    run-level failure from a failure that belongs to a single node
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!
//! # Error Categories
//!
//! - **Run-level** (short-circuit the whole run): [`TierGraphError::ScanError`],
//!   [`TierGraphError::ConfigurationError`], [`TierGraphError::IntegrityError`]
//! - **Per-node** (recorded in the aggregate result, siblings keep going):
//!   [`TierGraphError::UnresolvedReference`], [`TierGraphError::ParseFailure`]
//! - **Graph store**: [`TierGraphError::DuplicateNode`],
//!   [`TierGraphError::DuplicateField`], [`TierGraphError::NodeNotFound`],
//!   [`TierGraphError::CircularInclude`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use tiergraph::core::{TierGraphError, user_friendly_error};
//!
//! let error = TierGraphError::ConfigurationError {
//!     message: "no start point configured".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for tiergraph operations
///
/// Every variant carries the data needed to attribute the failure either to a
/// specific node id or to the run as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierGraphError {
    /// A tier directory (or the template root) could not be listed or stat'd
    ///
    /// Fatal to the whole run: without complete tier mappings no include can
    /// be resolved reliably.
    #[error("Failed to scan tier '{tier}' at {path}: {reason}")]
    ScanError {
        /// Tier being scanned (or `root` for the template root itself)
        tier: String,
        /// Directory that failed
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// An include names a structural id with no known template file
    #[error("Unresolved reference '{target}' included from node '{node}'")]
    UnresolvedReference {
        /// Node whose template contains the include
        node: String,
        /// Structural id that could not be mapped to a file
        target: String,
    },

    /// A template could not be read or its syntax could not be lexed
    #[error("Failed to parse template for node '{node}': {reason}")]
    ParseFailure {
        /// Node whose template failed
        node: String,
        /// Underlying read or lexer failure
        reason: String,
    },

    /// A node id was registered twice under the strict identity policy
    #[error("Node '{id}' already exists in the graph")]
    DuplicateNode {
        /// The duplicated node id
        id: String,
    },

    /// A field name was attached twice under the strict identity policy
    #[error("Field '{field}' is already defined on node '{id}'")]
    DuplicateField {
        /// Node owning the field
        id: String,
        /// The duplicated field name
        field: String,
    },

    /// A mutation referenced a node id that was never registered
    #[error("Node '{id}' not found in the graph")]
    NodeNotFound {
        /// The unknown node id
        id: String,
    },

    /// Include relations form a cycle where an acyclic order was required
    #[error("Circular include detected: {chain}")]
    CircularInclude {
        /// The cycle, rendered as `a → b → a`
        chain: String,
    },

    /// Neither a start file nor a start directory was supplied, or a
    /// configuration value is invalid
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem
        message: String,
    },

    /// Graph identity violations detected during a strict run
    #[error("Graph integrity check failed with {} error(s)", errors.len())]
    IntegrityError {
        /// Every duplicate node/field violation, in detection order
        errors: Vec<TierGraphError>,
    },

    /// I/O failure outside of a specific template parse
    #[error("I/O error ({kind:?}): {message}")]
    IoError {
        /// Kind of the underlying error
        kind: std::io::ErrorKind,
        /// Rendered error message
        message: String,
    },

    /// Invalid TOML in a configuration file
    #[error("Failed to parse configuration: {reason}")]
    ConfigParseError {
        /// Parser message
        reason: String,
    },

    /// Other errors not covered by specific variants
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl TierGraphError {
    /// Whether this error aborts the whole run rather than a single node.
    #[must_use]
    pub const fn is_run_level(&self) -> bool {
        matches!(
            self,
            Self::ScanError { .. }
                | Self::ConfigurationError { .. }
                | Self::IntegrityError { .. }
                | Self::ConfigParseError { .. }
        )
    }

    /// Node id this error is attributed to, if it belongs to a single node.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::UnresolvedReference { node, .. } | Self::ParseFailure { node, .. } => Some(node),
            Self::DuplicateNode { id }
            | Self::DuplicateField { id, .. }
            | Self::NodeNotFound { id } => Some(id),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TierGraphError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for TierGraphError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigParseError {
            reason: error.to_string(),
        }
    }
}

/// Error context wrapper that adds a suggestion and details for CLI users
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: TierGraphError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: TierGraphError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognises [`TierGraphError`], [`std::io::Error`], and [`toml::de::Error`];
/// anything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(tiergraph_error) = error.downcast_ref::<TierGraphError>() {
        return create_error_context(tiergraph_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let context = ErrorContext::new(TierGraphError::from(std::io::Error::new(
            io_error.kind(),
            io_error.to_string(),
        )));
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => context
                .with_suggestion("Check file ownership and permissions of the template tree and output directory"),
            std::io::ErrorKind::NotFound => context
                .with_suggestion("Check that the file or directory exists and the path is correct"),
            _ => context,
        };
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return create_error_context(TierGraphError::from(toml_error.clone()));
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(TierGraphError::Other {
        message,
    })
}

/// Map each [`TierGraphError`] variant to a context with tailored suggestions.
fn create_error_context(error: TierGraphError) -> ErrorContext {
    match &error {
        TierGraphError::ScanError { tier, .. } => {
            let suggestion = format!(
                "Make sure the '{tier}' tier directory exists under the template root and is readable"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("All three tier directories (small, medium, large) are scanned before any template is parsed")
        }
        TierGraphError::ConfigurationError { .. } => ErrorContext::new(error)
            .with_suggestion("Pass --start-file or --start-dir, or set start_file/start_dir in tiergraph.toml"),
        TierGraphError::ConfigParseError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax in tiergraph.toml. Verify quotes, brackets, and key names"),
        TierGraphError::UnresolvedReference { target, .. } => {
            let suggestion = format!(
                "Create a template for '{target}' in the matching tier directory, or fix the include name"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Include names use the form <tier>-<name>, e.g. small-header for small/01-header.tmpl")
        }
        TierGraphError::IntegrityError { errors } => {
            let details =
                errors.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n");
            ErrorContext::new(error)
                .with_suggestion("Remove the duplicated templates or fields, or resolve with the lenient policy")
                .with_details(details)
        }
        TierGraphError::CircularInclude { .. } => ErrorContext::new(error)
            .with_suggestion("Generators that need an ordering cannot handle include cycles; break the cycle or use the JSON generator"),
        _ => ErrorContext::new(error),
    }
}
