//! NIBArchive format constants and value-type tags.

/// Magic bytes at the start of a NIBArchive file.
pub const NIB_MAGIC: &[u8; 10] = b"NIBArchive";

/// Offset of the format word that follows the magic.
pub const FORMAT_WORD_OFFSET: usize = 10;

/// Offset of the header size (in 32-bit words).
pub const HEADER_WORDS_OFFSET: usize = 14;

/// Offset of the first `(count, offset)` section pair.
pub const SECTION_TABLE_OFFSET: usize = 18;

/// Format word written by current producers.
pub const FORMAT_WORD: u32 = 1;

/// Header size in words written by current producers.
/// One word for the size itself plus two per section.
pub const HEADER_WORDS: u32 = 9;

/// Number of sections, always in the order objects, keys, values, classes.
pub const SECTION_COUNT: usize = 4;

/// Total header size in bytes for a 9-word header.
pub const HEADER_SIZE: usize = SECTION_TABLE_OFFSET + SECTION_COUNT * 8;

/// Class entry tag for an ordinary class name.
pub const CLASS_TAG_PLAIN: u8 = 0x80;

/// Class entry tag carrying an extra u32 before the name.
pub const CLASS_TAG_EXTENDED: u8 = 0x81;

/// Marker key flagging an object whose values are really a positional list.
pub const INLINED_VALUE_KEY: &str = "NSInlinedValue";

/// Key repeated once per element of a positional list.
pub const EMPTY_KEY: &str = "UINibEncoderEmptyKey";

/// Key holding the payload of string and data objects.
pub const BYTES_KEY: &str = "NS.bytes";

/// First byte of a packed tuple-of-doubles payload.
pub const DOUBLE_TUPLE_MARKER: u8 = 0x07;

/// Type tag of a value record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueType {
    /// Unsigned 8-bit integer
    Byte = 0x00,
    /// Unsigned 16-bit integer
    Short = 0x01,
    /// Unsigned 32-bit integer
    Long = 0x02,
    /// Signed 64-bit integer
    LongLong = 0x03,
    /// Boolean false, no payload
    False = 0x04,
    /// Boolean true, no payload
    True = 0x05,
    /// 32-bit float
    Float = 0x06,
    /// 64-bit float
    Double = 0x07,
    /// Length-prefixed bytes or UTF-8 text
    Data = 0x08,
    /// Nil, no payload
    Nil = 0x09,
    /// Index into the objects section
    Object = 0x0A,
}

impl ValueType {
    /// Convert a raw tag byte.
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Self::Byte,
            0x01 => Self::Short,
            0x02 => Self::Long,
            0x03 => Self::LongLong,
            0x04 => Self::False,
            0x05 => Self::True,
            0x06 => Self::Float,
            0x07 => Self::Double,
            0x08 => Self::Data,
            0x09 => Self::Nil,
            0x0A => Self::Object,
            _ => return None,
        })
    }

    /// Raw tag byte.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Class names decoded as positional collections rather than keyed objects.
pub const COLLECTION_CLASSES: &[&str] = &[
    "NSArray",
    "NSMutableArray",
    "NSMutableSet",
    "NSDictionary",
    "NSMutableDictionary",
];

/// Check whether a class name is one of the unkeyed container classes.
#[inline]
pub fn is_collection_class(classname: &str) -> bool {
    COLLECTION_CLASSES.contains(&classname)
}

/// Classes that are always followed in the class table by their superclass.
///
/// Returns the superclass that must occupy the next table slot.
pub fn paired_superclass(classname: &str) -> Option<&'static str> {
    match classname {
        "NSNibAuxiliaryActionConnector" => Some("NSNibConnector"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(NIB_MAGIC, b"NIBArchive");
        assert_eq!(NIB_MAGIC.len(), 10);
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 50);
        assert_eq!(HEADER_WORDS as usize, 1 + SECTION_COUNT * 2);
    }

    #[test]
    fn test_value_type_tags() {
        for tag in 0x00..=0x0Au8 {
            let ty = ValueType::from_u8(tag).unwrap();
            assert_eq!(ty.as_u8(), tag);
        }
        assert_eq!(ValueType::from_u8(0x0B), None);
        assert_eq!(ValueType::from_u8(0xFF), None);
    }

    #[test]
    fn test_collection_classes() {
        assert!(is_collection_class("NSMutableSet"));
        assert!(!is_collection_class("NSView"));
        assert_eq!(paired_superclass("NSNibAuxiliaryActionConnector"), Some("NSNibConnector"));
        assert_eq!(paired_superclass("NSNibConnector"), None);
    }
}
