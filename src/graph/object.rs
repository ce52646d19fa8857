//! Builder-side object graph.
//!
//! Objects live in a [`NibGraph`] arena and refer to each other by
//! [`ObjectId`]. Every edge is an index, so cyclic graphs (a view and its
//! superview, next-responder chains) need no shared ownership. The optional
//! parent link is only a lookup aid; traversal never follows it.

use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;

use super::value::{ObjectId, PropValue};
use crate::nib::{BYTES_KEY, EMPTY_KEY, INLINED_VALUE_KEY};
use crate::util::{Error, Result};

/// Numeric payload of an `NSNumber`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

/// Concrete class of an array-like object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayClass {
    List,
    MutableList,
    MutableSet,
    Dictionary,
    MutableDictionary,
}

impl ArrayClass {
    /// Archived class name.
    pub fn classname(self) -> &'static str {
        match self {
            Self::List => "NSArray",
            Self::MutableList => "NSMutableArray",
            Self::MutableSet => "NSMutableSet",
            Self::Dictionary => "NSDictionary",
            Self::MutableDictionary => "NSMutableDictionary",
        }
    }
}

/// What an object serializes as.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Keyed properties, serialized in insertion order
    Generic,
    /// Interned `NSString`
    String(String),
    /// `NSMutableString`, never interned
    MutableString(String),
    /// Interned `NSData`
    Data(Vec<u8>),
    /// `NSNumber`
    Number(Number),
    /// Positional items with no keys of their own
    Array(Vec<PropValue>),
}

/// A node of the builder graph.
#[derive(Debug, Clone)]
pub struct NibObject {
    pub(crate) id: ObjectId,
    pub(crate) classname: String,
    pub(crate) original_classname: Option<String>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) properties: IndexMap<String, PropValue>,
    pub(crate) kind: NodeKind,
}

impl NibObject {
    fn new(id: ObjectId, classname: String, parent: Option<ObjectId>, kind: NodeKind) -> Self {
        Self {
            id,
            classname,
            original_classname: None,
            parent,
            properties: IndexMap::new(),
            kind,
        }
    }

    /// Creation serial.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Class name written to the archive.
    #[inline]
    pub fn classname(&self) -> &str {
        &self.classname
    }

    /// Class name before any swap; the current name when never swapped.
    pub fn original_classname(&self) -> &str {
        self.original_classname.as_deref().unwrap_or(&self.classname)
    }

    /// Owning parent, if one was recorded.
    #[inline]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Serialization kind.
    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Property by key.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.properties.get(key)
    }

    /// Check whether a property is set.
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Items of an array-like object.
    pub fn items(&self) -> Option<&[PropValue]> {
        match &self.kind {
            NodeKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Key/value pairs as they are serialized.
    ///
    /// Array-like objects always produce the inlined marker followed by one
    /// empty-key pair per item.
    pub fn key_value_pairs(&self) -> Vec<(&str, Cow<'_, PropValue>)> {
        match &self.kind {
            NodeKind::Generic => self
                .properties
                .iter()
                .map(|(k, v)| (k.as_str(), Cow::Borrowed(v)))
                .collect(),
            NodeKind::String(text) | NodeKind::MutableString(text) => {
                vec![(BYTES_KEY, Cow::Owned(PropValue::InlineString(text.clone())))]
            }
            NodeKind::Data(bytes) => vec![(BYTES_KEY, Cow::Owned(PropValue::Data(bytes.clone())))],
            NodeKind::Number(Number::Double(v)) => vec![("NS.dblval", Cow::Owned(PropValue::Double(*v)))],
            NodeKind::Number(Number::Int(v)) => {
                let value = match u8::try_from(*v) {
                    Ok(byte) => PropValue::Byte(byte),
                    Err(_) => PropValue::Int(*v),
                };
                vec![("NS.intval", Cow::Owned(value))]
            }
            NodeKind::Array(items) => {
                let mut pairs = Vec::with_capacity(items.len() + 1);
                pairs.push((INLINED_VALUE_KEY, Cow::Owned(PropValue::Bool(true))));
                pairs.extend(items.iter().map(|item| (EMPTY_KEY, Cow::Borrowed(item))));
                pairs
            }
        }
    }

    /// Objects referenced directly, in traversal order.
    pub fn children(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let values: Box<dyn Iterator<Item = &PropValue> + '_> = match &self.kind {
            NodeKind::Array(items) => Box::new(items.iter()),
            NodeKind::Generic => Box::new(self.properties.values()),
            _ => Box::new(std::iter::empty()),
        };
        values.filter_map(PropValue::as_object)
    }
}

/// Arena of builder objects plus the interning caches.
#[derive(Debug, Default)]
pub struct NibGraph {
    objects: Vec<NibObject>,
    strings: HashMap<String, ObjectId>,
    data: HashMap<Vec<u8>, ObjectId>,
}

impl NibGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects created so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if no objects were created.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Get an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&NibObject> {
        self.objects.get(id.index())
    }

    /// All objects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &NibObject> {
        self.objects.iter()
    }

    fn push(&mut self, classname: &str, parent: Option<ObjectId>, kind: NodeKind) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(NibObject::new(id, classname.to_string(), parent, kind));
        id
    }

    /// Create a plain keyed object.
    pub fn object(&mut self, classname: &str) -> ObjectId {
        self.push(classname, None, NodeKind::Generic)
    }

    /// Create a keyed object owned by `parent`.
    pub fn child_object(&mut self, classname: &str, parent: ObjectId) -> ObjectId {
        self.push(classname, Some(parent), NodeKind::Generic)
    }

    /// Create a keyed object with an initial property set.
    pub fn object_with<K, V, I>(&mut self, classname: &str, properties: I) -> ObjectId
    where
        K: Into<String>,
        V: Into<PropValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let id = self.object(classname);
        let mut obj = ObjectMut { graph: self, id };
        for (key, value) in properties {
            obj.set(key, value);
        }
        id
    }

    /// Interned `NSString` for `text`.
    pub fn string(&mut self, text: &str) -> ObjectId {
        if let Some(&id) = self.strings.get(text) {
            return id;
        }
        let id = self.push("NSString", None, NodeKind::String(text.to_string()));
        self.strings.insert(text.to_string(), id);
        id
    }

    /// Interned `NSData` for `bytes`.
    pub fn data(&mut self, bytes: &[u8]) -> ObjectId {
        if let Some(&id) = self.data.get(bytes) {
            return id;
        }
        let id = self.push("NSData", None, NodeKind::Data(bytes.to_vec()));
        self.data.insert(bytes.to_vec(), id);
        id
    }

    /// Fresh `NSMutableString`.
    pub fn mutable_string(&mut self, text: &str) -> ObjectId {
        self.push("NSMutableString", None, NodeKind::MutableString(text.to_string()))
    }

    /// Fresh `NSNumber`.
    pub fn number(&mut self, value: Number) -> ObjectId {
        self.push("NSNumber", None, NodeKind::Number(value))
    }

    /// Array-like object of the given class.
    pub fn array<V, I>(&mut self, class: ArrayClass, items: I) -> ObjectId
    where
        V: Into<PropValue>,
        I: IntoIterator<Item = V>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.push(class.classname(), None, NodeKind::Array(items))
    }

    /// `NSArray` of `items`.
    pub fn list<V: Into<PropValue>>(&mut self, items: impl IntoIterator<Item = V>) -> ObjectId {
        self.array(ArrayClass::List, items)
    }

    /// `NSMutableArray` of `items`.
    pub fn mutable_list<V: Into<PropValue>>(&mut self, items: impl IntoIterator<Item = V>) -> ObjectId {
        self.array(ArrayClass::MutableList, items)
    }

    /// `NSMutableSet` of `items`.
    pub fn mutable_set<V: Into<PropValue>>(&mut self, items: impl IntoIterator<Item = V>) -> ObjectId {
        self.array(ArrayClass::MutableSet, items)
    }

    /// `NSDictionary` whose items are already flattened key/value objects.
    pub fn dictionary<V: Into<PropValue>>(&mut self, items: impl IntoIterator<Item = V>) -> ObjectId {
        self.array(ArrayClass::Dictionary, items)
    }

    /// `NSMutableDictionary` whose items are already flattened key/value objects.
    pub fn mutable_dictionary<V: Into<PropValue>>(
        &mut self,
        items: impl IntoIterator<Item = V>,
    ) -> ObjectId {
        self.array(ArrayClass::MutableDictionary, items)
    }

    /// `NSDictionary` from key/value pairs.
    ///
    /// Text becomes an interned string and numbers become `NSNumber`
    /// objects; the result stores `k0, v0, k1, v1, ...` as its items.
    pub fn dictionary_from_pairs<K, V, I>(&mut self, pairs: I) -> ObjectId
    where
        K: Into<PropValue>,
        V: Into<PropValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut items = Vec::new();
        for (k, v) in pairs {
            items.push(self.boxed(k.into()));
            items.push(self.boxed(v.into()));
        }
        self.push(ArrayClass::Dictionary.classname(), None, NodeKind::Array(items))
    }

    /// `UIProxyObject` standing in for an object outside the archive.
    pub fn proxy(&mut self, identifier: &str) -> ObjectId {
        let id = self.object("UIProxyObject");
        ObjectMut { graph: self, id }.set("UIProxiedObjectIdentifier", identifier);
        id
    }

    /// Mutable handle for setting properties on `id`.
    pub fn edit(&mut self, id: ObjectId) -> Result<ObjectMut<'_>> {
        if id.index() >= self.objects.len() {
            return Err(Error::UnknownObject(id.serial()));
        }
        Ok(ObjectMut { graph: self, id })
    }

    /// Replace text and bytes with their interned objects.
    fn intern_value(&mut self, value: PropValue) -> PropValue {
        match value {
            PropValue::Text(text) => PropValue::Object(self.string(&text)),
            PropValue::Data(bytes) => PropValue::Object(self.data(&bytes)),
            other => other,
        }
    }

    /// Wrap scalars in objects, for dictionary entries.
    fn boxed(&mut self, value: PropValue) -> PropValue {
        match value {
            PropValue::Int(v) => PropValue::Object(self.number(Number::Int(v))),
            PropValue::Byte(v) => PropValue::Object(self.number(Number::Int(i64::from(v)))),
            PropValue::Double(v) => PropValue::Object(self.number(Number::Double(v))),
            other => self.intern_value(other),
        }
    }

    fn node_mut(&mut self, id: ObjectId) -> &mut NibObject {
        &mut self.objects[id.index()]
    }
}

/// Mutable view of one object, created by [`NibGraph::edit`].
pub struct ObjectMut<'g> {
    graph: &'g mut NibGraph,
    id: ObjectId,
}

impl ObjectMut<'_> {
    /// Id of the object being edited.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Read-only view of the object.
    pub fn object(&self) -> &NibObject {
        &self.graph.objects[self.id.index()]
    }

    /// Property by key.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.object().get(key)
    }

    /// Set a property, overwriting any previous value in place.
    ///
    /// Text and bytes are swapped for their interned objects.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) -> &mut Self {
        let value = self.graph.intern_value(value.into());
        self.graph.node_mut(self.id).properties.insert(key.into(), value);
        self
    }

    /// Set a property when a value is present; `None` leaves it untouched.
    pub fn set_opt<V: Into<PropValue>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Set a property only if it is not set yet.
    pub fn set_if_empty(&mut self, key: impl Into<String>, value: impl Into<PropValue>) -> &mut Self {
        let key = key.into();
        if !self.object().contains(&key) {
            self.set(key, value);
        }
        self
    }

    /// Set a property unless `value` equals `default`.
    pub fn set_if_not_default(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropValue>,
        default: impl Into<PropValue>,
    ) -> &mut Self {
        let value = value.into();
        if value != default.into() {
            self.set(key, value);
        }
        self
    }

    /// Remove a property, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.graph.node_mut(self.id).properties.shift_remove(key)
    }

    /// Push onto a sequence property, creating it when absent.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Result<&mut Self> {
        self.extend(key, [value.into()])
    }

    /// Extend a sequence property, creating it when absent.
    pub fn extend<V, I>(&mut self, key: impl Into<String>, values: I) -> Result<&mut Self>
    where
        V: Into<PropValue>,
        I: IntoIterator<Item = V>,
    {
        let key = key.into();
        let values = values.into_iter().map(Into::into);
        let properties = &mut self.graph.node_mut(self.id).properties;
        match properties.get_mut(&key) {
            Some(PropValue::List(items)) => items.extend(values),
            Some(_) => return Err(Error::NotASequence { key }),
            None => {
                properties.insert(key, PropValue::List(values.collect()));
            }
        }
        Ok(self)
    }

    /// Bitwise-or into an integer property; unset counts as 0.
    pub fn flags_or(&mut self, key: impl Into<String>, value: i64) -> Result<&mut Self> {
        self.update_flags(key.into(), |current| current | value)
    }

    /// Bitwise-and into an integer property; unset counts as 0.
    pub fn flags_and(&mut self, key: impl Into<String>, value: i64) -> Result<&mut Self> {
        self.update_flags(key.into(), |current| current & value)
    }

    fn update_flags(&mut self, key: String, op: impl FnOnce(i64) -> i64) -> Result<&mut Self> {
        let current = match self.get(&key) {
            None | Some(PropValue::Nil) => 0,
            Some(value) => value
                .as_int()
                .ok_or_else(|| Error::NotAnInteger { key: key.clone() })?,
        };
        self.set(key, PropValue::Int(op(current)));
        Ok(self)
    }

    /// Append an item to an array-like object.
    pub fn add_item(&mut self, item: impl Into<PropValue>) -> Result<&mut Self> {
        let node = self.graph.node_mut(self.id);
        match &mut node.kind {
            NodeKind::Array(items) => {
                items.push(item.into());
                Ok(self)
            }
            _ => Err(Error::NotASequence {
                key: format!("items of {}", node.classname),
            }),
        }
    }

    /// Swap the archived class name, remembering the original once.
    pub fn set_classname(&mut self, classname: &str) -> &mut Self {
        let node = self.graph.node_mut(self.id);
        if node.original_classname.is_none() {
            node.original_classname = Some(std::mem::replace(&mut node.classname, classname.to_string()));
        } else {
            node.classname = classname.to_string();
        }
        self
    }

    /// Record the owning parent.
    pub fn set_parent(&mut self, parent: Option<ObjectId>) -> &mut Self {
        self.graph.node_mut(self.id).parent = parent;
        self
    }
}
