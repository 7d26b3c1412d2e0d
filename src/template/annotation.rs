//! Structured annotations embedded in template comments.
//!
//! An annotation is a comment whose text starts with a literal tag followed
//! by a JSON object:
//!
//! ```text
//! {{! @import {"name": "footerHeader"} }}
//! {{> small-header}}
//!
//! {{! @node {"inline": true} }}
//! ```
//!
//! `@import` enriches the next include or field; `@node` describes the node
//! whose template contains it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{IMPORT_TAG, NODE_META_TAG};

/// Kind of an annotation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    /// Supplies a display name for the next include
    Import,
    /// Supplies metadata for the enclosing node
    NodeMeta,
    /// Not produced by the parser; kept for documents written by other tools
    Unknown,
}

/// Developer-supplied metadata parsed from a template comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBlock {
    pub kind: AnnotationKind,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl AnnotationBlock {
    /// Create an empty block of the given kind.
    #[must_use]
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            kind,
            options: Map::new(),
        }
    }

    /// An import annotation naming a relation.
    #[must_use]
    pub fn import(name: impl Into<String>) -> Self {
        let mut block = Self::new(AnnotationKind::Import);
        block.options.insert("name".to_string(), Value::String(name.into()));
        block
    }

    /// Relation display name (`name` option), if present.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.options.get("name").and_then(Value::as_str)
    }

    /// Whether the block marks its node as inlined rather than standalone.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.options.get("inline").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Merge another block's options into this one; later keys win.
    pub fn merge(&mut self, other: &AnnotationBlock) {
        for (key, value) in &other.options {
            self.options.insert(key.clone(), value.clone());
        }
    }
}

/// Outcome of interpreting a comment as an annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentAnnotation {
    /// Plain comment, no recognised tag
    None,
    /// A recognised, well-formed annotation
    Block(AnnotationBlock),
    /// A recognised tag whose payload is not a JSON object
    Invalid {
        /// The tag that was recognised
        tag: &'static str,
        /// Why the payload was rejected
        reason: String,
    },
}

/// Interpret comment text as a structured annotation.
///
/// # Examples
///
/// ```rust
/// use tiergraph::template::annotation::{AnnotationKind, CommentAnnotation, parse_comment};
///
/// match parse_comment(r#"@import {"name": "footerHeader"}"#) {
///     CommentAnnotation::Block(block) => {
///         assert_eq!(block.kind, AnnotationKind::Import);
///         assert_eq!(block.display_name(), Some("footerHeader"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
///
/// assert_eq!(parse_comment("just a note"), CommentAnnotation::None);
/// ```
#[must_use]
pub fn parse_comment(text: &str) -> CommentAnnotation {
    let text = text.trim();

    for (tag, kind) in [(IMPORT_TAG, AnnotationKind::Import), (NODE_META_TAG, AnnotationKind::NodeMeta)] {
        let Some(payload) = text.strip_prefix(tag) else {
            continue;
        };
        // "@imports" is not "@import"
        if !payload.is_empty() && !payload.starts_with(|c: char| c.is_whitespace() || c == '{') {
            continue;
        }

        let payload = payload.trim();
        if payload.is_empty() {
            return CommentAnnotation::Invalid {
                tag,
                reason: "missing JSON payload".to_string(),
            };
        }

        return match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(options)) => CommentAnnotation::Block(AnnotationBlock {
                kind,
                options,
            }),
            Ok(other) => CommentAnnotation::Invalid {
                tag,
                reason: format!("payload must be a JSON object, found {other}"),
            },
            Err(e) => CommentAnnotation::Invalid {
                tag,
                reason: e.to_string(),
            },
        };
    }

    CommentAnnotation::None
}
