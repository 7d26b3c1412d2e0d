//! Node graph store.
//!
//! The graph is the product of a resolution run: one [`Node`] per unique
//! structural id, each carrying the [`Field`]s its template references and the
//! [`Relation`]s (includes) it makes to other nodes. The store is append-only
//! for the duration of a run: nodes are never removed, and a node's fields and
//! relations are only ever extended.
//!
//! # Identity policies
//!
//! Two node-identity policies are supported, selected by [`IdentityPolicy`]:
//!
//! | Operation | `Lenient` (default) | `Strict` |
//! |---|---|---|
//! | `add_node` on an existing id | returns the existing node | `DuplicateNode` |
//! | `add_field` with an existing name | appended (repeats kept in order) | `DuplicateField` |
//!
//! Relations are always appended under both policies: a node may include the
//! same target more than once, and order is significant.

mod order;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::TierGraphError;
use crate::template::annotation::{AnnotationBlock, AnnotationKind};

/// A variable or loop variable referenced by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// True for section (iteration block) variables
    pub iterable: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub annotations: Map<String, Value>,
}

impl Field {
    /// A plain (non-iterable) field with no annotations.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iterable: false,
            annotations: Map::new(),
        }
    }

    /// An iterable field with no annotations.
    #[must_use]
    pub fn iterable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iterable: true,
            annotations: Map::new(),
        }
    }
}

/// A directed include edge from the owning node to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub target: String,
    pub annotation: AnnotationBlock,
    /// False when `target` has no template file
    #[serde(default = "default_true")]
    pub resolved: bool,
}

fn default_true() -> bool {
    true
}

impl Relation {
    /// A resolved relation annotated with `annotation`.
    #[must_use]
    pub fn new(target: impl Into<String>, annotation: AnnotationBlock) -> Self {
        Self {
            target: target.into(),
            annotation,
            resolved: true,
        }
    }

    /// Display name from the annotation, falling back to the target id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.annotation.display_name().unwrap_or(&self.target)
    }
}

/// Parse status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Registered, parse not finished yet
    Pending,
    /// Template parsed to completion
    Parsed,
    /// Template could not be read or lexed, or contains an unresolved include
    Failed,
    /// No template file exists for this id
    Unresolved,
}

/// One entry in the graph, corresponding to one template fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub status: NodeStatus,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<AnnotationBlock>,
}

impl Node {
    fn new(id: String) -> Self {
        Self {
            id,
            path: None,
            status: NodeStatus::Pending,
            fields: Vec::new(),
            relations: Vec::new(),
            meta: None,
        }
    }

    /// First field with the given name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Relations pointing at `target`, in include order.
    pub fn relations_to<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| r.target == target)
    }

    /// Whether a `@node {"inline": true}` annotation marks this node as inlined.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.meta.as_ref().is_some_and(AnnotationBlock::is_inline)
    }
}

/// Node identity and field-storage policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    /// Idempotent `add_node`, fields appended unconditionally
    #[default]
    Lenient,
    /// Duplicate nodes and duplicate field names are errors
    Strict,
}

/// The graph store: node id → [`Node`], kept in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeGraph {
    #[serde(skip)]
    policy: IdentityPolicy,
    nodes: BTreeMap<String, Node>,
}

impl NodeGraph {
    /// Create an empty graph using `policy`.
    #[must_use]
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            nodes: BTreeMap::new(),
        }
    }

    /// The identity policy this graph enforces.
    #[must_use]
    pub const fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Register an empty node.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::DuplicateNode`] if `id` exists and the policy is strict.
    /// Under the lenient policy the existing node is returned untouched.
    pub fn add_node(&mut self, id: &str) -> Result<&mut Node, TierGraphError> {
        if self.nodes.contains_key(id) && self.policy == IdentityPolicy::Strict {
            return Err(TierGraphError::DuplicateNode {
                id: id.to_string(),
            });
        }
        Ok(self.nodes.entry(id.to_string()).or_insert_with(|| Node::new(id.to_string())))
    }

    #[must_use]
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, TierGraphError> {
        self.nodes.get_mut(id).ok_or_else(|| TierGraphError::NodeNotFound {
            id: id.to_string(),
        })
    }

    /// Attach a field to a node.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::NodeNotFound`] for an unknown id;
    /// [`TierGraphError::DuplicateField`] for a repeated name under the strict policy.
    pub fn add_field(&mut self, id: &str, field: Field) -> Result<(), TierGraphError> {
        let strict = self.policy == IdentityPolicy::Strict;
        let node = self.node_mut(id)?;
        if strict && node.field(&field.name).is_some() {
            return Err(TierGraphError::DuplicateField {
                id: id.to_string(),
                field: field.name,
            });
        }
        node.fields.push(field);
        Ok(())
    }

    /// Append a relation to a node. Duplicates are kept.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::NodeNotFound`] if the source id is unknown.
    pub fn add_relation(&mut self, id: &str, relation: Relation) -> Result<(), TierGraphError> {
        self.node_mut(id)?.relations.push(relation);
        Ok(())
    }

    /// Attach node-level metadata, merging into any metadata already present.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::NodeNotFound`] if the id is unknown.
    pub fn add_meta(&mut self, id: &str, meta: &AnnotationBlock) -> Result<(), TierGraphError> {
        let node = self.node_mut(id)?;
        node.meta.get_or_insert_with(|| AnnotationBlock::new(AnnotationKind::NodeMeta)).merge(meta);
        Ok(())
    }

    pub(crate) fn set_status(&mut self, id: &str, status: NodeStatus) -> Result<(), TierGraphError> {
        self.node_mut(id)?.status = status;
        Ok(())
    }

    pub(crate) fn set_path(&mut self, id: &str, path: PathBuf) -> Result<(), TierGraphError> {
        self.node_mut(id)?.path = Some(path);
        Ok(())
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of nodes that include `target`, with one entry per relation.
    #[must_use]
    pub fn includers_of(&self, target: &str) -> Vec<&str> {
        self.nodes
            .values()
            .flat_map(|node| node.relations_to(target).map(|_| node.id.as_str()))
            .collect()
    }
}
