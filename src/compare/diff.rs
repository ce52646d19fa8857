//! Cycle-safe structural differ.
//!
//! [`compare`] returns a [`DiffSession`], a lazy iterator over [`Issue`]s in
//! traversal order. Each session owns its visited-pair set and work stack,
//! so sessions are independent of each other.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::rc::Rc;

use super::node::{CmpGraph, CmpNode, NodeId};
use super::order::{arrange, collection_order, CollectionOrder};
use crate::nib::Value;

/// Which archive of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "LHS",
            Self::Right => "RHS",
        })
    }
}

/// What differs at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    /// Nodes of different kinds: value, collection or object
    KindMismatch {
        left: &'static str,
        right: &'static str,
    },
    /// Value type tags differ
    TypeMismatch { left: u8, right: u8 },
    /// Scalar payloads differ; already formatted for display
    ValueMismatch { left: String, right: String },
    ClassMismatch { left: String, right: String },
    /// The two graphs loop back to different ancestors
    CycleMismatch,
    LengthMismatch { left: usize, right: usize },
    /// `side` lacks `key`; `present` describes the other side's value
    MissingKey {
        side: Side,
        classname: String,
        key: String,
        present: String,
    },
}

/// One reported difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// Keys and indices from the root, joined by `->`
    pub path: String,
    /// Class of the object or collection holding the differing entry
    pub parent_class: Option<String>,
    pub kind: IssueKind,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        let parent = self.parent_class.as_deref().unwrap_or("root");
        match &self.kind {
            IssueKind::KindMismatch { left, right } => {
                write!(f, "{path} (in {parent}): types don't match {left} != {right}")
            }
            IssueKind::TypeMismatch { left, right } => {
                write!(f, "{path} (in {parent}): value types don't match {left} != {right}")
            }
            IssueKind::ValueMismatch { left, right } => {
                write!(f, "{path} (in {parent}): difference {left} != {right}")
            }
            IssueKind::ClassMismatch { left, right } => {
                write!(f, "{path} (in {parent}): class name doesn't match {left} != {right}")
            }
            IssueKind::CycleMismatch => write!(f, "{path}: cycle to different places"),
            IssueKind::LengthMismatch { left, right } => {
                write!(f, "{path} mismatched length: {left} != {right}")
            }
            IssueKind::MissingKey {
                side,
                classname,
                key,
                present,
            } => write!(
                f,
                "{path} {side} ({classname}) missing key {key}, {} {present}",
                side.other()
            ),
        }
    }
}

/// Compare two graphs from their roots.
pub fn compare<'a>(left: &'a CmpGraph, right: &'a CmpGraph) -> DiffSession<'a> {
    DiffSession::new(left, right)
}

// ============================================================================
// Session
// ============================================================================

/// One step of the current path, shared between sibling tasks.
struct Trail {
    left: NodeId,
    right: NodeId,
    segment: Option<String>,
    depth: usize,
    parent: Option<Rc<Trail>>,
}

impl Trail {
    fn ancestors(self: &Rc<Self>) -> impl Iterator<Item = &Trail> {
        std::iter::successors(Some(&**self), |t| t.parent.as_deref())
    }

    /// Depth of the shallowest step whose node on `side` is `id`.
    fn first_position(self: &Rc<Self>, side: Side, id: NodeId) -> Option<usize> {
        self.ancestors()
            .filter(|t| match side {
                Side::Left => t.left == id,
                Side::Right => t.right == id,
            })
            .map(|t| t.depth)
            .last()
    }

    fn path(self: &Rc<Self>) -> String {
        let mut segments: Vec<&str> = self.ancestors().filter_map(|t| t.segment.as_deref()).collect();
        segments.reverse();
        segments.join("->")
    }

    fn last_key(&self) -> Option<&str> {
        self.segment.as_deref()
    }
}

/// A pending pair comparison.
struct Task {
    left: NodeId,
    right: NodeId,
    segment: Option<String>,
    parent: Option<Rc<Trail>>,
    parent_class: Option<Rc<str>>,
    /// Class of the keyed object holding this entry, for ordering policy
    owner: Option<Rc<str>>,
}

enum Work {
    Compare(Task),
    Report(Issue),
}

/// Lazy, single-use comparison of two graphs.
pub struct DiffSession<'a> {
    left: &'a CmpGraph,
    right: &'a CmpGraph,
    seen: HashSet<(NodeId, NodeId)>,
    stack: Vec<Work>,
}

impl<'a> DiffSession<'a> {
    /// Start a comparison of the two roots.
    pub fn new(left: &'a CmpGraph, right: &'a CmpGraph) -> Self {
        let root = Task {
            left: left.root(),
            right: right.root(),
            segment: None,
            parent: None,
            parent_class: None,
            owner: None,
        };
        Self {
            left,
            right,
            seen: HashSet::new(),
            stack: vec![Work::Compare(root)],
        }
    }

    /// Compare one pair, queueing its findings and child pairs in order.
    fn step(&mut self, task: Task) {
        if !self.seen.insert((task.left, task.right)) {
            return;
        }
        let trail = Rc::new(Trail {
            left: task.left,
            right: task.right,
            segment: task.segment,
            depth: task.parent.as_ref().map_or(0, |p| p.depth + 1),
            parent: task.parent,
        });
        let lhs = self.left.node(task.left);
        let rhs = self.right.node(task.right);
        let parent_class = task.parent_class;
        let issue = |kind: IssueKind| Issue {
            path: trail.path(),
            parent_class: parent_class.as_deref().map(str::to_string),
            kind,
        };

        let mut work = Vec::new();
        match (lhs, rhs) {
            (CmpNode::Value(l), CmpNode::Value(r)) => {
                if l.value_type() != r.value_type() {
                    work.push(Work::Report(issue(IssueKind::TypeMismatch {
                        left: l.value_type().as_u8(),
                        right: r.value_type().as_u8(),
                    })));
                }
                if let Some((left, right)) = scalar_difference(trail.last_key(), l, r) {
                    work.push(Work::Report(issue(IssueKind::ValueMismatch { left, right })));
                }
            }
            _ if lhs.kind_name() != rhs.kind_name() => {
                work.push(Work::Report(issue(IssueKind::KindMismatch {
                    left: lhs.kind_name(),
                    right: rhs.kind_name(),
                })));
            }
            _ => self.step_containers(&trail, task.owner, &issue, &mut work),
        }

        self.stack.extend(work.into_iter().rev());
    }

    fn step_containers(
        &self,
        trail: &Rc<Trail>,
        owner: Option<Rc<str>>,
        issue: &dyn Fn(IssueKind) -> Issue,
        work: &mut Vec<Work>,
    ) {
        let lhs = self.left.node(trail.left);
        let rhs = self.right.node(trail.right);
        let lclass = lhs.classname().unwrap_or_default();
        let rclass = rhs.classname().unwrap_or_default();
        if lclass != rclass {
            work.push(Work::Report(issue(IssueKind::ClassMismatch {
                left: lclass.to_string(),
                right: rclass.to_string(),
            })));
            return;
        }

        let lpos = trail.first_position(Side::Left, trail.left);
        let rpos = trail.first_position(Side::Right, trail.right);
        if lpos != rpos {
            work.push(Work::Report(issue(IssueKind::CycleMismatch)));
            return;
        }
        if lpos.is_some_and(|p| p < trail.depth) {
            return;
        }

        let class: Rc<str> = Rc::from(lclass);
        let child = |left: NodeId, right: NodeId, segment: String, entry_owner: Option<Rc<str>>| {
            Work::Compare(Task {
                left,
                right,
                segment: Some(segment),
                parent: Some(Rc::clone(trail)),
                parent_class: Some(Rc::clone(&class)),
                owner: entry_owner,
            })
        };

        match (lhs, rhs) {
            (CmpNode::Collection { entries: le, .. }, CmpNode::Collection { entries: re, .. }) => {
                if le.len() != re.len() {
                    work.push(Work::Report(issue(IssueKind::LengthMismatch {
                        left: le.len(),
                        right: re.len(),
                    })));
                }
                let order = match (owner.as_deref(), trail.last_key()) {
                    (Some(owner), Some(key)) => collection_order(owner, key),
                    _ => CollectionOrder::Positional,
                };
                let le = arrange(self.left, le, order);
                let re = arrange(self.right, re, order);
                for (i, (&l, &r)) in le.iter().zip(re.iter()).enumerate() {
                    work.push(child(l, r, i.to_string(), None));
                }
            }
            (CmpNode::Object { entries: le, .. }, CmpNode::Object { entries: re, .. }) => {
                let keys: BTreeSet<&str> = le.keys().chain(re.keys()).map(String::as_str).collect();
                for key in keys {
                    let kind = match (le.get(key), re.get(key)) {
                        (Some(&l), Some(&r)) => {
                            work.push(child(l, r, key.to_string(), Some(Rc::clone(&class))));
                            continue;
                        }
                        (None, Some(&r)) => IssueKind::MissingKey {
                            side: Side::Left,
                            classname: lclass.to_string(),
                            key: key.to_string(),
                            present: describe_entry(self.right, key, r),
                        },
                        (Some(&l), None) => IssueKind::MissingKey {
                            side: Side::Right,
                            classname: rclass.to_string(),
                            key: key.to_string(),
                            present: describe_entry(self.left, key, l),
                        },
                        (None, None) => continue,
                    };
                    work.push(Work::Report(issue(kind)));
                }
            }
            _ => {}
        }
    }
}

impl Iterator for DiffSession<'_> {
    type Item = Issue;

    fn next(&mut self) -> Option<Issue> {
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Report(issue) => return Some(issue),
                Work::Compare(task) => self.step(task),
            }
        }
        None
    }
}

// ============================================================================
// Value formatting
// ============================================================================

fn is_flags_key(key: Option<&str>) -> bool {
    key.is_some_and(|k| k.ends_with("Flags") || k.ends_with("Flags2"))
}

/// Unsigned 64-bit hex, the way flag words read best.
fn flags_hex(v: i64) -> String {
    format!("{:#x}", v as u64)
}

/// Formatted pair when two scalars differ.
///
/// Integers and floats compare by numeric value regardless of tag; booleans
/// on the left are only checked through their tag.
fn scalar_difference(key: Option<&str>, l: &Value, r: &Value) -> Option<(String, String)> {
    let equal = match (l, r) {
        (Value::True | Value::False, _) => return None,
        (Value::Data(a), Value::Data(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        _ => match (numeric(l), numeric(r)) {
            (Some(Numeric::Int(a)), Some(Numeric::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    };
    if equal {
        return None;
    }
    match (l.as_int(), r.as_int()) {
        (Some(a), Some(b)) if is_flags_key(key) => Some((flags_hex(a), flags_hex(b))),
        _ => Some((l.to_string(), r.to_string())),
    }
}

#[derive(Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

fn numeric(v: &Value) -> Option<Numeric> {
    match v {
        Value::True => Some(Numeric::Int(1)),
        Value::False => Some(Numeric::Int(0)),
        _ => v
            .as_int()
            .map(Numeric::Int)
            .or_else(|| v.as_float().map(Numeric::Float)),
    }
}

/// The present side of a missing-key report.
fn describe_entry(graph: &CmpGraph, key: &str, id: NodeId) -> String {
    match graph.node(id).as_value().and_then(Value::as_int) {
        Some(v) if is_flags_key(Some(key)) => flags_hex(v),
        _ => graph.describe(id),
    }
}
