//! Error types for the NIBArchive library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for NIBArchive operations.
///
/// Every variant is fatal for the archive being processed. Differences found
/// by the comparer are reported as [`crate::compare::Issue`] values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The buffer does not start with the `NIBArchive` literal
    #[error("Not a NIBArchive file: bad magic bytes")]
    BadMagic,

    /// A flex number wider than 31 bits
    #[error("Malformed flex number at offset {offset}")]
    MalformedVarint { offset: usize },

    /// Offsets, lengths or indices point outside the archive
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// A property references an object the compiler never visited
    #[error("Dangling reference from key {key} of {class}")]
    DanglingReference { class: String, key: String },

    /// A value record names a key index outside the key table
    #[error("Unresolved key index {index} (key count: {count})")]
    UnresolvedKey { index: u32, count: usize },

    /// An object-reference value points outside the object table
    #[error("Unresolved object reference {index} (object count: {count})")]
    UnresolvedReference { index: u32, count: usize },

    /// The builder holds a value shape the format cannot encode
    #[error("Unsupported value for key {key} of {class}: {detail}")]
    UnsupportedValueType {
        class: String,
        key: String,
        detail: String,
    },

    /// `append`/`extend` on a property that is not a sequence
    #[error("Property {key} is not a sequence")]
    NotASequence { key: String },

    /// Flag helpers on a property that is not an integer
    #[error("Property {key} is not an integer")]
    NotAnInteger { key: String },

    /// Object id does not belong to this graph
    #[error("Unknown object id {0}")]
    UnknownObject(u32),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON rendering failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a corrupt-archive error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptArchive(msg.into())
    }
}

/// Result type alias for NIBArchive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::BadMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::UnresolvedReference { index: 7, count: 3 };
        assert!(e.to_string().contains('7'));
        assert!(e.to_string().contains('3'));

        let e = Error::corrupt("values section truncated");
        assert!(matches!(e, Error::CorruptArchive(_)));
        assert!(e.to_string().contains("truncated"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
