//! Read-only comparison graph.
//!
//! Nodes live in one arena. Object nodes occupy indices `0..object_count`
//! in archive order, so an object-reference value `@n` resolves to
//! `NodeId(n)` directly; scalar value nodes follow them.

use std::fmt;

use indexmap::IndexMap;

use crate::nib::Value;

/// Index of a node in a [`CmpGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the comparison graph.
#[derive(Debug, Clone, PartialEq)]
pub enum CmpNode {
    /// Scalar value with its type tag
    Value(Value),
    /// Unkeyed container, entries in archive order
    Collection { classname: String, entries: Vec<NodeId> },
    /// Keyed object, entries in archive order
    Object {
        classname: String,
        entries: IndexMap<String, NodeId>,
    },
}

impl CmpNode {
    /// Runtime kind, for kind mismatch reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Collection { .. } => "collection",
            Self::Object { .. } => "object",
        }
    }

    /// Class name of collections and objects.
    pub fn classname(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Collection { classname, .. } | Self::Object { classname, .. } => Some(classname),
        }
    }

    /// Number of entries of collections and objects.
    pub fn entry_count(&self) -> usize {
        match self {
            Self::Value(_) => 0,
            Self::Collection { entries, .. } => entries.len(),
            Self::Object { entries, .. } => entries.len(),
        }
    }

    /// Scalar payload of a value node.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Decoded archive as a graph of comparable nodes.
#[derive(Debug, Clone, Default)]
pub struct CmpGraph {
    pub(crate) nodes: Vec<CmpNode>,
    pub(crate) object_count: usize,
}

impl CmpGraph {
    /// Root object (archive object 0).
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node by id.
    ///
    /// Ids handed out by this graph are always valid.
    #[inline]
    pub fn node(&self, id: NodeId) -> &CmpNode {
        &self.nodes[id.index()]
    }

    /// Node by id, `None` when out of range.
    pub fn get(&self, id: NodeId) -> Option<&CmpNode> {
        self.nodes.get(id.index())
    }

    /// Total node count, objects and values.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of archive objects.
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// Entry `key` of an object node.
    pub fn entry(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.get(id)? {
            CmpNode::Object { entries, .. } => entries.get(key).copied(),
            _ => None,
        }
    }

    /// Entries of a collection node.
    pub fn items(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.get(id)? {
            CmpNode::Collection { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// One-line summary: `value (type t)` or `Class (n entries)`.
    pub fn describe(&self, id: NodeId) -> String {
        match self.node(id) {
            CmpNode::Value(v) => format!("{v} (type {})", v.value_type().as_u8()),
            node => format!(
                "{} ({} entries)",
                node.classname().unwrap_or_default(),
                node.entry_count()
            ),
        }
    }
}
