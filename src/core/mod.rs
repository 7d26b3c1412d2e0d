//! Core types and functionality for tiergraph
//!
//! This module holds the pieces every other module depends on: the error
//! taxonomy of a resolution run and its user-facing rendering.
//!
//! - [`TierGraphError`] - Enumerated error types covering all failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format

pub mod error;

pub use error::{ErrorContext, TierGraphError, user_friendly_error};
