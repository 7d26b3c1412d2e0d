//! Global constants used throughout the tiergraph codebase.
//!
//! Naming conventions, default file extensions, and annotation tags live here
//! so the lexer, parser, path resolver, and CLI agree on them.

/// Default template file extension (without the leading dot).
pub const DEFAULT_EXTENSION: &str = "tmpl";

/// Default name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "tiergraph.toml";

/// Separator between a tier name and a template name in structural ids
/// (e.g. `small-header`).
pub const ID_SEPARATOR: char = '-';

/// Marker that hides a file or directory from tier scans.
pub const HIDDEN_PREFIX: char = '.';

/// Comment tag that supplies the display name of the next include.
pub const IMPORT_TAG: &str = "@import";

/// Comment tag that supplies metadata for the enclosing node.
pub const NODE_META_TAG: &str = "@node";

/// Default opening delimiter for template tags.
pub const DEFAULT_OPEN_DELIMITER: &str = "{{";

/// Default closing delimiter for template tags.
pub const DEFAULT_CLOSE_DELIMITER: &str = "}}";

/// Name of the document written by the JSON graph generator.
pub const GRAPH_DOCUMENT_NAME: &str = "graph.json";
