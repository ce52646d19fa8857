//! Lifting decoded sections into a comparison graph.

use indexmap::map::Entry;

use super::node::{CmpGraph, CmpNode, NodeId};
use crate::nib::{is_collection_class, Sections, Value, BYTES_KEY, EMPTY_KEY, INLINED_VALUE_KEY};
use crate::util::{Error, Result};

/// Key whose target names the custom class behind a class swapper.
const CLASS_NAME_KEY: &str = "NSClassName";

/// Build the comparison graph of `sections`.
///
/// The first pass creates one shell per object; the second fills entries
/// and turns object-reference values into edges, which is where cycles
/// appear. Duplicate keys on one object keep the first occurrence.
pub fn lift(sections: &Sections) -> Result<CmpGraph> {
    let object_count = sections.objects.len();
    if object_count == 0 {
        return Err(Error::corrupt("archive has no objects"));
    }

    let mut graph = CmpGraph {
        nodes: Vec::with_capacity(object_count + sections.values.len()),
        object_count,
    };

    for (index, obj) in sections.objects.iter().enumerate() {
        let classname = sections
            .classes
            .get(obj.class_index as usize)
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "object {index} has class index {} of {}",
                    obj.class_index,
                    sections.classes.len()
                ))
            })?
            .name
            .clone();
        let shell = if is_collection_class(&classname) {
            CmpNode::Collection {
                classname,
                entries: Vec::new(),
            }
        } else {
            CmpNode::Object {
                classname,
                entries: Default::default(),
            }
        };
        graph.nodes.push(shell);
    }

    for (index, obj) in sections.objects.iter().enumerate() {
        let records = sections.values.get(obj.value_range()).ok_or_else(|| {
            Error::corrupt(format!("object {index} values out of range"))
        })?;
        for record in records {
            let key = sections
                .keys
                .get(record.key_index as usize)
                .ok_or(Error::UnresolvedKey {
                    index: record.key_index,
                    count: sections.keys.len(),
                })?;
            let is_collection = matches!(graph.nodes[index], CmpNode::Collection { .. });
            if is_collection {
                if key == INLINED_VALUE_KEY {
                    continue;
                }
                if key != EMPTY_KEY {
                    return Err(Error::corrupt(format!(
                        "collection object {index} has keyed entry {key}"
                    )));
                }
            } else if let CmpNode::Object { entries, .. } = &graph.nodes[index] {
                if entries.contains_key(key.as_str()) {
                    continue;
                }
            }

            let target = resolve(&mut graph, &record.value)?;
            match &mut graph.nodes[index] {
                CmpNode::Collection { entries, .. } => entries.push(target),
                CmpNode::Object { entries, .. } => {
                    if let Entry::Vacant(slot) = entries.entry(key.clone()) {
                        slot.insert(target);
                    }
                }
                CmpNode::Value(_) => {}
            }
        }
    }

    qualify_swapped_classes(&mut graph);
    tracing::debug!(
        objects = object_count,
        nodes = graph.nodes.len(),
        "lifted comparison graph"
    );
    Ok(graph)
}

/// Edge to an object node, or a fresh value node.
fn resolve(graph: &mut CmpGraph, value: &Value) -> Result<NodeId> {
    match value {
        Value::Object(index) => {
            if (*index as usize) < graph.object_count {
                Ok(NodeId(*index))
            } else {
                Err(Error::UnresolvedReference {
                    index: *index,
                    count: graph.object_count,
                })
            }
        }
        scalar => {
            let id = NodeId(graph.nodes.len() as u32);
            graph.nodes.push(CmpNode::Value(scalar.clone()));
            Ok(id)
        }
    }
}

/// Append `/<name>` to objects naming a custom class, so swappers for
/// different classes compare as different classes.
fn qualify_swapped_classes(graph: &mut CmpGraph) {
    for index in 0..graph.object_count {
        let id = NodeId(index as u32);
        let Some(name) = graph
            .entry(id, CLASS_NAME_KEY)
            .and_then(|target| graph.entry(target, BYTES_KEY))
            .and_then(|bytes| graph.node(bytes).as_value())
            .and_then(Value::as_bytes)
            .map(|b| String::from_utf8_lossy(b).into_owned())
        else {
            continue;
        };
        if let CmpNode::Object { classname, .. } = &mut graph.nodes[index] {
            classname.push('/');
            classname.push_str(&name);
        }
    }
}

impl CmpGraph {
    /// Build the comparison graph of decoded sections.
    pub fn lift(sections: &Sections) -> Result<Self> {
        lift(sections)
    }
}
