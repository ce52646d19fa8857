//! Property values held by builder objects.

use std::fmt;

/// Identity of a builder object: its creation serial within a [`super::NibGraph`].
///
/// Serials are handed out in creation order and never reused. They identify
/// objects; they do not decide output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw serial number.
    #[inline]
    pub fn serial(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property value on a builder object.
///
/// `Text` and `Data` are inputs: storing them through the graph's setters
/// replaces them with a reference to the interned `NSString`/`NSData`
/// object. Left in place (list items, payloads) they encode as raw
/// string records.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Reference to another object in the same graph
    Object(ObjectId),
    /// Text to intern as an `NSString`
    Text(String),
    /// Bytes to intern as an `NSData`
    Data(Vec<u8>),
    /// Text stored inline, never interned
    InlineString(String),
    /// Explicit single byte
    Byte(u8),
    /// Explicit 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Integer, encoded with the smallest fitting tag
    Int(i64),
    Bool(bool),
    /// Explicit nil
    Nil,
    /// Sequence built by `append`/`extend`; encodes only as a tuple of doubles
    List(Vec<PropValue>),
}

impl PropValue {
    /// Referenced object, if this is a reference.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Integer view; explicit bytes count as integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Byte(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Short description of the value's shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Text(_) => "text",
            Self::Data(_) => "data",
            Self::InlineString(_) => "inline string",
            Self::Byte(_) => "byte",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Int(_) => "integer",
            Self::Bool(_) => "bool",
            Self::Nil => "nil",
            Self::List(_) => "list",
        }
    }
}

impl From<ObjectId> for PropValue {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for PropValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Data(b)
    }
}

impl From<&[u8]> for PropValue {
    fn from(b: &[u8]) -> Self {
        Self::Data(b.to_vec())
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl<const N: usize> From<[f64; N]> for PropValue {
    fn from(v: [f64; N]) -> Self {
        Self::List(v.iter().copied().map(Self::Double).collect())
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(v: Vec<PropValue>) -> Self {
        Self::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(PropValue::from("x"), PropValue::Text("x".into()));
        assert_eq!(PropValue::from(3i32), PropValue::Int(3));
        assert_eq!(PropValue::from(true), PropValue::Bool(true));
        assert_eq!(
            PropValue::from([1.0, 2.0]),
            PropValue::List(vec![PropValue::Double(1.0), PropValue::Double(2.0)])
        );
        assert_eq!(PropValue::from(ObjectId(4)).as_object(), Some(ObjectId(4)));
    }

    #[test]
    fn test_int_view() {
        assert_eq!(PropValue::Byte(9).as_int(), Some(9));
        assert_eq!(PropValue::Int(-1).as_int(), Some(-1));
        assert_eq!(PropValue::Double(1.0).as_int(), None);
    }
}
