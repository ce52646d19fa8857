//! NIBArchive reader: file access and section decoding.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use super::format::*;
use super::sections::{ClassEntry, ObjectEntry, Sections, Value, ValueEntry};
use super::varint;
use crate::util::{Error, Result};

/// Whole-file input for decoding.
/// Supports both memory-mapped and buffered I/O modes.
pub struct NibFile {
    inner: FileInner,
}

enum FileInner {
    /// Memory-mapped file (preferred)
    Mmap(Mmap),
    /// File read fully into memory (fallback)
    Buffer(Vec<u8>),
}

impl NibFile {
    /// Open a file for reading with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();

        let inner = if use_mmap && size > 0 {
            // Safety: the file is opened read-only and the map is dropped with `self`.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            FileInner::Mmap(mmap)
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            FileInner::Buffer(buf)
        };

        Ok(Self { inner })
    }

    /// Raw file contents.
    pub fn bytes(&self) -> &[u8] {
        match &self.inner {
            FileInner::Mmap(mmap) => &mmap[..],
            FileInner::Buffer(buf) => buf.as_slice(),
        }
    }

    /// Decode the file's sections.
    pub fn sections(&self) -> Result<Sections> {
        decode(self.bytes())
    }
}

/// Read and decode an archive from disk.
pub fn read_archive(path: impl AsRef<Path>) -> Result<Sections> {
    NibFile::open(path)?.sections()
}

/// Check whether a buffer starts with the archive magic.
#[inline]
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(NIB_MAGIC)
}

/// Parsed archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Word stored right after the magic (1 for current producers).
    pub format_word: u32,
    /// Header size in 32-bit words.
    pub header_words: u32,
    /// `(count, byte offset)` for objects, keys, values, classes.
    pub sections: [(u32, u32); SECTION_COUNT],
}

/// Parse and validate the archive header.
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    if !has_magic(bytes) {
        return Err(Error::BadMagic);
    }

    let mut cur = ByteCursor::new(bytes, FORMAT_WORD_OFFSET);
    let format_word = cur.u32()?;
    let header_words = cur.u32()?;

    let pair_count = header_words.saturating_sub(1) as usize / 2;
    if pair_count < SECTION_COUNT {
        return Err(Error::corrupt(format!(
            "header declares {header_words} words, need at least {HEADER_WORDS}"
        )));
    }

    let mut sections = [(0u32, 0u32); SECTION_COUNT];
    for slot in sections.iter_mut() {
        *slot = (cur.u32()?, cur.u32()?);
    }

    Ok(Header {
        format_word,
        header_words,
        sections,
    })
}

/// Decode a complete archive held in memory.
pub fn decode(bytes: &[u8]) -> Result<Sections> {
    let header = parse_header(bytes)?;
    let [objects, keys, values, classes] = header.sections;

    let sections = Sections {
        objects: decode_objects(bytes, objects)?,
        keys: decode_keys(bytes, keys)?,
        values: decode_values(bytes, values)?,
        classes: decode_classes(bytes, classes)?,
    };

    tracing::debug!(
        objects = sections.objects.len(),
        keys = sections.keys.len(),
        values = sections.values.len(),
        classes = sections.classes.len(),
        "decoded NIBArchive sections"
    );

    Ok(sections)
}

// ============================================================================
// Section decoders
// ============================================================================

fn decode_objects(bytes: &[u8], (count, offset): (u32, u32)) -> Result<Vec<ObjectEntry>> {
    let mut cur = ByteCursor::at_section(bytes, offset, "objects")?;
    let mut objects = Vec::with_capacity(capacity_hint(count, bytes.len()));
    for _ in 0..count {
        let class_index = cur.flex()?;
        let first_value = cur.flex()?;
        let value_count = cur.flex()?;
        objects.push(ObjectEntry::new(class_index, first_value, value_count));
    }
    Ok(objects)
}

fn decode_keys(bytes: &[u8], (count, offset): (u32, u32)) -> Result<Vec<String>> {
    let mut cur = ByteCursor::at_section(bytes, offset, "keys")?;
    let mut keys = Vec::with_capacity(capacity_hint(count, bytes.len()));
    for _ in 0..count {
        let len = cur.flex()? as usize;
        keys.push(String::from_utf8(cur.take(len)?.to_vec())?);
    }
    Ok(keys)
}

fn decode_classes(bytes: &[u8], (count, offset): (u32, u32)) -> Result<Vec<ClassEntry>> {
    let mut cur = ByteCursor::at_section(bytes, offset, "classes")?;
    let mut classes = Vec::with_capacity(capacity_hint(count, bytes.len()));
    for _ in 0..count {
        // Length counts the trailing NUL.
        let len = cur.flex()? as usize;
        if len == 0 {
            return Err(Error::corrupt(format!("zero-length class name at offset {}", cur.pos)));
        }
        let extra = match cur.u8()? {
            CLASS_TAG_PLAIN => None,
            CLASS_TAG_EXTENDED => {
                let extra = cur.u32()?;
                tracing::trace!(extra, "extended class entry");
                Some(extra)
            }
            tag => {
                return Err(Error::corrupt(format!(
                    "unknown class tag {tag:#04x} at offset {}",
                    cur.pos - 1
                )))
            }
        };
        let raw = cur.take(len)?;
        let name = String::from_utf8(raw[..len - 1].to_vec())?;
        classes.push(ClassEntry { name, extra });
    }
    Ok(classes)
}

fn decode_values(bytes: &[u8], (count, offset): (u32, u32)) -> Result<Vec<ValueEntry>> {
    let mut cur = ByteCursor::at_section(bytes, offset, "values")?;
    let mut values = Vec::with_capacity(capacity_hint(count, bytes.len()));
    for _ in 0..count {
        let key_index = cur.flex()?;
        let tag_pos = cur.pos;
        let tag = cur.u8()?;
        let ty = ValueType::from_u8(tag).ok_or_else(|| {
            Error::corrupt(format!("unknown value type {tag:#04x} at offset {tag_pos}"))
        })?;
        let value = match ty {
            ValueType::Byte => Value::Byte(cur.u8()?),
            ValueType::Short => Value::Short(LittleEndian::read_u16(cur.take(2)?)),
            ValueType::Long => Value::Long(cur.u32()?),
            ValueType::LongLong => Value::LongLong(LittleEndian::read_i64(cur.take(8)?)),
            ValueType::False => Value::False,
            ValueType::True => Value::True,
            ValueType::Float => Value::Float(LittleEndian::read_f32(cur.take(4)?)),
            ValueType::Double => Value::Double(LittleEndian::read_f64(cur.take(8)?)),
            ValueType::Data => {
                let len = cur.flex()? as usize;
                Value::Data(cur.take(len)?.to_vec())
            }
            ValueType::Nil => Value::Nil,
            ValueType::Object => Value::Object(cur.u32()?),
        };
        values.push(ValueEntry::new(key_index, value));
    }
    Ok(values)
}

/// Keep hostile counts from driving huge up-front allocations.
#[inline]
fn capacity_hint(count: u32, available: usize) -> usize {
    (count as usize).min(available)
}

// ============================================================================
// Bounds-checked cursor
// ============================================================================

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn at_section(bytes: &'a [u8], offset: u32, name: &str) -> Result<Self> {
        let pos = offset as usize;
        if pos > bytes.len() {
            return Err(Error::corrupt(format!(
                "{name} section offset {pos} beyond end of archive ({} bytes)",
                bytes.len()
            )));
        }
        Ok(Self::new(bytes, pos))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "read of {len} bytes at offset {} past end of archive ({} bytes)",
                    self.pos,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn flex(&mut self) -> Result<u32> {
        let (value, used) = varint::decode(self.bytes, self.pos)?;
        self.pos += used;
        Ok(value)
    }
}
