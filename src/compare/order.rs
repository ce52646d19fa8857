//! Canonical ordering for collections whose archive order is not meaningful.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::node::{CmpGraph, CmpNode, NodeId};
use crate::nib::Value;

/// Hash standing in for an edge back onto the current path.
pub const CYCLE_SENTINEL: u64 = 999;

/// How the entries of a collection are paired up for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOrder {
    /// Archive order
    Positional,
    /// Sorted by layout-constraint attributes
    ConstraintAttributes,
    /// Sorted by recursive structural hash
    StructuralHash,
}

/// Collections known to be unordered, by owning class (`None` for any) and key.
const UNORDERED: &[(Option<&str>, &str, CollectionOrder)] = &[
    (None, "NSViewConstraints", CollectionOrder::ConstraintAttributes),
    (Some("NSIBObjectData"), "NSConnections", CollectionOrder::StructuralHash),
];

/// Ordering policy for the collection stored under `key` of an object of
/// class `owner`.
pub fn collection_order(owner: &str, key: &str) -> CollectionOrder {
    UNORDERED
        .iter()
        .find(|(class, k, _)| *k == key && class.map_or(true, |c| c == owner))
        .map_or(CollectionOrder::Positional, |(_, _, order)| *order)
}

/// Entries of a collection arranged for elementwise comparison.
pub fn arrange(graph: &CmpGraph, entries: &[NodeId], order: CollectionOrder) -> Vec<NodeId> {
    let mut sorted = entries.to_vec();
    match order {
        CollectionOrder::Positional => {}
        CollectionOrder::ConstraintAttributes => {
            let mut keyed: Vec<_> = sorted.iter().map(|&id| (constraint_key(graph, id), id)).collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            sorted = keyed.into_iter().map(|(_, id)| id).collect();
        }
        CollectionOrder::StructuralHash => {
            sorted.sort_by_cached_key(|&id| structural_hash(graph, id));
        }
    }
    sorted
}

// ============================================================================
// Constraint attributes
// ============================================================================

/// One component of a constraint sort key.
///
/// Ordered by variant, then by payload; numbers use [`f64::total_cmp`] so
/// NaN priorities still sort deterministically.
#[derive(Debug, Clone)]
enum SortAttr {
    Missing,
    Number(f64),
    Bytes(Vec<u8>),
    Flag(bool),
    Nil,
    Node(String, usize),
}

impl SortAttr {
    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Number(_) => 1,
            Self::Bytes(_) => 2,
            Self::Flag(_) => 3,
            Self::Nil => 4,
            Self::Node(..) => 5,
        }
    }
}

impl Ord for SortAttr {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Flag(a), Self::Flag(b)) => a.cmp(b),
            (Self::Node(ca, na), Self::Node(cb, nb)) => ca.cmp(cb).then(na.cmp(nb)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortAttr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortAttr {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortAttr {}

const CONSTRAINT_ATTRS: [&str; 5] = [
    "NSFirstAttribute",
    "NSSecondAttribute",
    "NSPriority",
    "NSFirstItem",
    "NSSecondItem",
];

fn constraint_key(graph: &CmpGraph, id: NodeId) -> Vec<SortAttr> {
    CONSTRAINT_ATTRS
        .iter()
        .map(|attr| match graph.entry(id, attr) {
            Some(entry) => sort_attr(graph.node(entry)),
            // Unset priority means required
            None if *attr == "NSPriority" => SortAttr::Number(1.0),
            None => SortAttr::Missing,
        })
        .collect()
}

fn sort_attr(node: &CmpNode) -> SortAttr {
    match node {
        CmpNode::Value(v) => match v {
            Value::True => SortAttr::Flag(true),
            Value::False => SortAttr::Flag(false),
            Value::Nil => SortAttr::Nil,
            Value::Data(b) => SortAttr::Bytes(b.clone()),
            other => other
                .as_int()
                .map(|i| i as f64)
                .or_else(|| other.as_float())
                .map_or(SortAttr::Missing, SortAttr::Number),
        },
        node => SortAttr::Node(node.classname().unwrap_or_default().to_string(), node.entry_count()),
    }
}

// ============================================================================
// Structural hash
// ============================================================================

/// Hash of the subgraph at `id`; edges back onto the current path hash as
/// [`CYCLE_SENTINEL`].
pub fn structural_hash(graph: &CmpGraph, id: NodeId) -> u64 {
    let mut path = Vec::new();
    hash_node(graph, id, &mut path)
}

fn hash_node(graph: &CmpGraph, id: NodeId, path: &mut Vec<NodeId>) -> u64 {
    if path.contains(&id) {
        return CYCLE_SENTINEL;
    }
    let mut hasher = DefaultHasher::new();
    match graph.node(id) {
        CmpNode::Value(v) => hash_value(v, &mut hasher),
        CmpNode::Collection { classname, entries } => {
            classname.hash(&mut hasher);
            path.push(id);
            for &entry in entries {
                hash_node(graph, entry, path).hash(&mut hasher);
            }
            path.pop();
        }
        CmpNode::Object { classname, entries } => {
            classname.hash(&mut hasher);
            path.push(id);
            for (key, &entry) in entries {
                key.hash(&mut hasher);
                hash_node(graph, entry, path).hash(&mut hasher);
            }
            path.pop();
        }
    }
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut DefaultHasher) {
    value.value_type().hash(hasher);
    match value {
        Value::Byte(v) => v.hash(hasher),
        Value::Short(v) => v.hash(hasher),
        Value::Long(v) => v.hash(hasher),
        Value::LongLong(v) => v.hash(hasher),
        Value::Float(v) => v.to_bits().hash(hasher),
        Value::Double(v) => v.to_bits().hash(hasher),
        Value::Data(b) => b.hash(hasher),
        Value::Object(i) => i.hash(hasher),
        Value::False | Value::True | Value::Nil => {}
    }
}
