//! The four flat, position-addressed sections of an archive.

use std::fmt;

use super::format::ValueType;

/// One entry of the objects section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Index into the classes section.
    pub class_index: u32,
    /// Index of the object's first value record.
    pub first_value: u32,
    /// Number of contiguous value records owned by the object.
    pub value_count: u32,
}

impl ObjectEntry {
    /// Create a new object entry.
    pub fn new(class_index: u32, first_value: u32, value_count: u32) -> Self {
        Self {
            class_index,
            first_value,
            value_count,
        }
    }

    /// Range of value indices owned by this object.
    #[inline]
    pub fn value_range(&self) -> std::ops::Range<usize> {
        let start = self.first_value as usize;
        start..start + self.value_count as usize
    }
}

/// Payload of a value record, one variant per type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Short(u16),
    Long(u32),
    LongLong(i64),
    False,
    True,
    Float(f32),
    Double(f64),
    /// Raw bytes; UTF-8 text for string payloads.
    Data(Vec<u8>),
    Nil,
    /// Index into the objects section.
    Object(u32),
}

impl Value {
    /// Type tag of this payload.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Byte(_) => ValueType::Byte,
            Self::Short(_) => ValueType::Short,
            Self::Long(_) => ValueType::Long,
            Self::LongLong(_) => ValueType::LongLong,
            Self::False => ValueType::False,
            Self::True => ValueType::True,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::Data(_) => ValueType::Data,
            Self::Nil => ValueType::Nil,
            Self::Object(_) => ValueType::Object,
        }
    }

    /// Integer view of the integer-tagged payloads.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Long(v) => Some(i64::from(v)),
            Self::LongLong(v) => Some(v),
            _ => None,
        }
    }

    /// Floating point view of the float-tagged payloads.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Bytes of a data payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Data(b) => Some(b),
            _ => None,
        }
    }

    /// Data payload as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::LongLong(v) => write!(f, "{v}"),
            Self::False => f.write_str("false"),
            Self::True => f.write_str("true"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Data(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => write!(f, "{text:?}"),
                Err(_) => {
                    f.write_str("<")?;
                    for b in bytes {
                        write!(f, "{b:02x}")?;
                    }
                    f.write_str(">")
                }
            },
            Self::Nil => f.write_str("nil"),
            Self::Object(idx) => write!(f, "@{idx}"),
        }
    }
}

/// One entry of the values section.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueEntry {
    /// Index into the keys section.
    pub key_index: u32,
    /// Typed payload.
    pub value: Value,
}

impl ValueEntry {
    /// Create a new value entry.
    pub fn new(key_index: u32, value: Value) -> Self {
        Self { key_index, value }
    }
}

/// One entry of the classes section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Class name without the trailing NUL.
    pub name: String,
    /// Extra field of a `0x81` entry. Producers store the index of the
    /// superclass entry that follows.
    pub extra: Option<u32>,
}

impl ClassEntry {
    /// Plain (`0x80`) class entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: None,
        }
    }

    /// Extended (`0x81`) class entry.
    pub fn with_extra(name: impl Into<String>, extra: u32) -> Self {
        Self {
            name: name.into(),
            extra: Some(extra),
        }
    }
}

/// Decoded archive: objects, keys, values and classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub objects: Vec<ObjectEntry>,
    pub keys: Vec<String>,
    pub values: Vec<ValueEntry>,
    pub classes: Vec<ClassEntry>,
}

impl Sections {
    /// Create empty sections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Class name of the object at `index`, if both indices are in range.
    pub fn class_name(&self, index: usize) -> Option<&str> {
        let obj = self.objects.get(index)?;
        self.classes
            .get(obj.class_index as usize)
            .map(|c| c.name.as_str())
    }

    /// Value records owned by the object at `index`.
    pub fn values_of(&self, index: usize) -> Option<&[ValueEntry]> {
        let obj = self.objects.get(index)?;
        self.values.get(obj.value_range())
    }

    /// Key string of a value record.
    pub fn key_of(&self, entry: &ValueEntry) -> Option<&str> {
        self.keys.get(entry.key_index as usize).map(String::as_str)
    }
}
