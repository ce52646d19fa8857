//! Compilation of a builder graph into archive sections.
//!
//! Objects are numbered in pre-order from the roots; every object gets its
//! output index on first visit, so cycles terminate and a reference always
//! points at an already numbered object once traversal is complete.

use std::collections::HashMap;

use byteorder::{LittleEndian, WriteBytesExt};

use super::object::{NibGraph, NibObject};
use super::value::{ObjectId, PropValue};
use crate::nib::{
    self, paired_superclass, ClassEntry, ObjectEntry, Sections, Value, ValueEntry, DOUBLE_TUPLE_MARKER,
};
use crate::util::{Error, Result};

/// Per-call compilation state: visited objects and their output indices.
pub struct CompilationContext<'g> {
    graph: &'g NibGraph,
    indices: HashMap<ObjectId, u32>,
    order: Vec<ObjectId>,
}

impl<'g> CompilationContext<'g> {
    /// Start a compilation over `graph`.
    pub fn new(graph: &'g NibGraph) -> Self {
        Self {
            graph,
            indices: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Number of objects visited so far.
    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Output index assigned to `id`, if it was visited.
    pub fn index_of(&self, id: ObjectId) -> Option<u32> {
        self.indices.get(&id).copied()
    }

    /// Walk each root in pre-order, numbering unseen objects.
    ///
    /// Array-like objects visit their items in order, other objects their
    /// property values in insertion order.
    pub fn add_roots(&mut self, roots: &[ObjectId]) -> Result<()> {
        for &root in roots {
            if self.graph.get(root).is_none() {
                return Err(Error::UnknownObject(root.serial()));
            }
            self.visit(root);
        }
        tracing::debug!(objects = self.order.len(), "numbered objects");
        Ok(())
    }

    fn visit(&mut self, root: ObjectId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.indices.contains_key(&id) {
                continue;
            }
            let Some(obj) = self.graph.get(id) else {
                continue;
            };
            self.indices.insert(id, self.order.len() as u32);
            self.order.push(id);

            let first = stack.len();
            stack.extend(obj.children());
            stack[first..].reverse();
        }
    }

    /// Produce the four sections for every visited object.
    pub fn build_sections(&self) -> Result<Sections> {
        let mut sections = Sections::new();
        let mut keys = Interner::default();
        let mut classes = ClassTable::default();

        for &id in &self.order {
            let Some(obj) = self.graph.get(id) else {
                return Err(Error::UnknownObject(id.serial()));
            };
            let first = sections.values.len();
            for (key, value) in obj.key_value_pairs() {
                let key_index = keys.intern(key);
                let value = self.encode_value(obj, key, &value)?;
                sections.values.push(ValueEntry::new(key_index, value));
            }
            let count = sections.values.len() - first;
            let class_index = classes.intern(obj.classname());
            sections
                .objects
                .push(ObjectEntry::new(class_index, first as u32, count as u32));
        }

        sections.keys = keys.names;
        sections.classes = classes.entries;
        tracing::debug!(
            objects = sections.objects.len(),
            keys = sections.keys.len(),
            values = sections.values.len(),
            classes = sections.classes.len(),
            "built sections"
        );
        Ok(sections)
    }

    fn encode_value(&self, obj: &NibObject, key: &str, value: &PropValue) -> Result<Value> {
        Ok(match value {
            PropValue::Object(target) => match self.indices.get(target) {
                Some(&index) => Value::Object(index),
                None => {
                    return Err(Error::DanglingReference {
                        class: obj.classname().to_string(),
                        key: key.to_string(),
                    })
                }
            },
            PropValue::Text(text) | PropValue::InlineString(text) => Value::Data(text.clone().into_bytes()),
            PropValue::Data(bytes) => Value::Data(bytes.clone()),
            PropValue::Byte(v) => Value::Byte(*v),
            PropValue::Float(v) => Value::Float(*v),
            PropValue::Double(v) => Value::Double(*v),
            PropValue::Bool(true) => Value::True,
            PropValue::Bool(false) => Value::False,
            PropValue::Nil => Value::Nil,
            PropValue::Int(v) => int_value(*v),
            PropValue::List(items) => Value::Data(pack_doubles(items).ok_or_else(|| {
                Error::UnsupportedValueType {
                    class: obj.classname().to_string(),
                    key: key.to_string(),
                    detail: describe_list(items),
                }
            })?),
        })
    }
}

/// Smallest fitting integer tag; negatives always take the 64-bit tag.
fn int_value(v: i64) -> Value {
    match v {
        0..=0x7f => Value::Byte(v as u8),
        0x80..=0x7fff => Value::Short(v as u16),
        0x8000..=0x7fff_ffff => Value::Long(v as u32),
        _ => Value::LongLong(v),
    }
}

/// Pack a tuple of floats as a marker byte plus little-endian doubles.
fn pack_doubles(items: &[PropValue]) -> Option<Vec<u8>> {
    let mut buf = Vec::with_capacity(1 + items.len() * 8);
    buf.push(DOUBLE_TUPLE_MARKER);
    for item in items {
        let v = match item {
            PropValue::Double(v) => *v,
            PropValue::Float(v) => f64::from(*v),
            _ => return None,
        };
        buf.write_f64::<LittleEndian>(v).ok()?;
    }
    Some(buf)
}

fn describe_list(items: &[PropValue]) -> String {
    let shapes: Vec<_> = items.iter().map(PropValue::shape).collect();
    format!("list of ({}) is not a tuple of floats", shapes.join(", "))
}

// ============================================================================
// Interning tables
// ============================================================================

#[derive(Default)]
struct Interner {
    names: Vec<String>,
    index: HashMap<String, u32>,
}

impl Interner {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }
}

#[derive(Default)]
struct ClassTable {
    entries: Vec<ClassEntry>,
    index: HashMap<String, u32>,
}

impl ClassTable {
    /// Index of `name`, adding it (and its paired superclass) on first use.
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.index.insert(name.to_string(), idx);
        match paired_superclass(name) {
            Some(superclass) => {
                tracing::trace!(class = name, superclass, index = idx, "paired class entry");
                self.entries.push(ClassEntry::with_extra(name, idx + 1));
                self.entries.push(ClassEntry::new(superclass));
                self.index.entry(superclass.to_string()).or_insert(idx + 1);
            }
            None => self.entries.push(ClassEntry::new(name)),
        }
        idx
    }
}

/// Compile the objects reachable from `roots` into archive bytes.
///
/// The first root becomes object 0, the root of the archive.
pub fn compile(graph: &NibGraph, roots: &[ObjectId]) -> Result<Vec<u8>> {
    let mut ctx = CompilationContext::new(graph);
    ctx.add_roots(roots)?;
    nib::encode(&ctx.build_sections()?)
}

impl NibGraph {
    /// Compile the objects reachable from `roots` into archive bytes.
    pub fn compile(&self, roots: &[ObjectId]) -> Result<Vec<u8>> {
        compile(self, roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nib::{EMPTY_KEY, INLINED_VALUE_KEY};

    #[test]
    fn test_int_tags() {
        assert_eq!(int_value(0), Value::Byte(0));
        assert_eq!(int_value(127), Value::Byte(127));
        assert_eq!(int_value(128), Value::Short(128));
        assert_eq!(int_value(0x7fff), Value::Short(0x7fff));
        assert_eq!(int_value(0x8000), Value::Long(0x8000));
        assert_eq!(int_value(0x7fff_ffff), Value::Long(0x7fff_ffff));
        assert_eq!(int_value(0x8000_0000), Value::LongLong(0x8000_0000));
        assert_eq!(int_value(-1), Value::LongLong(-1));
    }

    #[test]
    fn test_preorder_numbering() {
        let mut g = NibGraph::new();
        let root = g.object("Root");
        let a = g.object("A");
        let b = g.object("B");
        let a1 = g.object("A1");
        g.edit(root).unwrap().set("a", a).set("b", b);
        g.edit(a).unwrap().set("child", a1).set("back", root);

        let mut ctx = CompilationContext::new(&g);
        ctx.add_roots(&[root]).unwrap();
        assert_eq!(ctx.object_count(), 4);
        assert_eq!(ctx.index_of(root), Some(0));
        assert_eq!(ctx.index_of(a), Some(1));
        assert_eq!(ctx.index_of(a1), Some(2));
        assert_eq!(ctx.index_of(b), Some(3));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut g = NibGraph::new();
        let a = g.object("A");
        let b = g.object("B");
        g.edit(a).unwrap().set("next", b);
        g.edit(b).unwrap().set("next", a);

        let mut ctx = CompilationContext::new(&g);
        ctx.add_roots(&[a, b, a]).unwrap();
        let sections = ctx.build_sections().unwrap();
        assert_eq!(sections.objects.len(), 2);
        assert_eq!(sections.values[0].value, Value::Object(1));
        assert_eq!(sections.values[1].value, Value::Object(0));
    }

    #[test]
    fn test_list_encoding() {
        let mut g = NibGraph::new();
        let root = g.object("NSObject");
        let list = g.list([PropValue::Byte(1), PropValue::Byte(2)]);
        g.edit(root).unwrap().set("a", 1).set("b", list);

        let mut ctx = CompilationContext::new(&g);
        ctx.add_roots(&[root]).unwrap();
        let s = ctx.build_sections().unwrap();

        assert_eq!(s.keys, ["a", "b", INLINED_VALUE_KEY, EMPTY_KEY]);
        assert_eq!(s.class_name(0), Some("NSObject"));
        assert_eq!(s.class_name(1), Some("NSArray"));
        let list_values: Vec<_> = s.values_of(1).unwrap().iter().map(|v| v.value.clone()).collect();
        assert_eq!(list_values, [Value::True, Value::Byte(1), Value::Byte(2)]);
    }

    #[test]
    fn test_double_tuple() {
        let mut g = NibGraph::new();
        let root = g.object("NSView");
        g.edit(root).unwrap().set("NSFrame", [1.0, 2.0]);
        let mut ctx = CompilationContext::new(&g);
        ctx.add_roots(&[root]).unwrap();
        let s = ctx.build_sections().unwrap();
        let bytes = s.values[0].value.as_bytes().unwrap();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], DOUBLE_TUPLE_MARKER);
        assert_eq!(&bytes[1..9], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_mixed_list_is_unsupported() {
        let mut g = NibGraph::new();
        let root = g.object("NSView");
        g.edit(root)
            .unwrap()
            .set("odd", vec![PropValue::Double(1.0), PropValue::Int(2)]);
        let err = compile(&g, &[root]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValueType { ref key, .. } if key == "odd"));
    }

    #[test]
    fn test_dangling_reference() {
        let mut g = NibGraph::new();
        let root = g.object("NSView");
        g.edit(root).unwrap().set("ghost", ObjectId(99));
        let err = compile(&g, &[root]).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
    }

    #[test]
    fn test_auxiliary_connector_pairing() {
        let mut g = NibGraph::new();
        let root = g.object("NSObject");
        let aux = g.object("NSNibAuxiliaryActionConnector");
        let plain = g.object("NSNibConnector");
        g.edit(root).unwrap().set("x", aux).set("y", plain);

        let mut ctx = CompilationContext::new(&g);
        ctx.add_roots(&[root]).unwrap();
        let s = ctx.build_sections().unwrap();
        assert_eq!(
            s.classes,
            vec![
                ClassEntry::new("NSObject"),
                ClassEntry::with_extra("NSNibAuxiliaryActionConnector", 2),
                ClassEntry::new("NSNibConnector"),
            ]
        );
        let class_indices: Vec<_> = s.objects.iter().map(|o| o.class_index).collect();
        assert_eq!(class_indices, [0, 1, 2]);
    }
}
