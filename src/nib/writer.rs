//! NIBArchive writer: section encoding and file output.
//!
//! The header is always the 9-word form, so section bodies start at byte 50
//! and follow each other in the fixed order objects, keys, values, classes.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use super::sections::{ClassEntry, ObjectEntry, Sections, Value, ValueEntry};
use super::varint;
use crate::util::{Error, Result};

/// Encode sections into a complete archive.
pub fn encode(sections: &Sections) -> Result<Vec<u8>> {
    let objects = encode_objects(&sections.objects);
    let keys = encode_keys(&sections.keys)?;
    let values = encode_values(&sections.values)?;
    let classes = encode_classes(&sections.classes)?;

    let bodies = [
        (sections.objects.len(), &objects),
        (sections.keys.len(), &keys),
        (sections.values.len(), &values),
        (sections.classes.len(), &classes),
    ];

    let total = HEADER_SIZE + bodies.iter().map(|(_, b)| b.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(NIB_MAGIC);
    out.write_u32::<LittleEndian>(FORMAT_WORD)?;
    out.write_u32::<LittleEndian>(HEADER_WORDS)?;

    let mut offset = HEADER_SIZE;
    for (count, body) in &bodies {
        out.write_u32::<LittleEndian>(to_u32(*count, "section count")?)?;
        out.write_u32::<LittleEndian>(to_u32(offset, "section offset")?)?;
        offset += body.len();
    }
    for (_, body) in &bodies {
        out.extend_from_slice(body);
    }

    tracing::debug!(
        objects = sections.objects.len(),
        keys = sections.keys.len(),
        values = sections.values.len(),
        classes = sections.classes.len(),
        bytes = out.len(),
        "encoded NIBArchive"
    );

    Ok(out)
}

/// Encode sections and write them to `path`.
pub fn write_archive(path: impl AsRef<Path>, sections: &Sections) -> Result<()> {
    let bytes = encode(sections)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Section encoders
// ============================================================================

fn encode_objects(objects: &[ObjectEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(objects.len() * 3);
    for obj in objects {
        varint::encode_into(&mut buf, obj.class_index);
        varint::encode_into(&mut buf, obj.first_value);
        varint::encode_into(&mut buf, obj.value_count);
    }
    buf
}

fn encode_keys(keys: &[String]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for key in keys {
        varint::encode_into(&mut buf, to_u32(key.len(), "key length")?);
        buf.extend_from_slice(key.as_bytes());
    }
    Ok(buf)
}

fn encode_classes(classes: &[ClassEntry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for class in classes {
        varint::encode_into(&mut buf, to_u32(class.name.len() + 1, "class name length")?);
        match class.extra {
            None => buf.push(CLASS_TAG_PLAIN),
            Some(extra) => {
                buf.push(CLASS_TAG_EXTENDED);
                buf.write_u32::<LittleEndian>(extra)?;
            }
        }
        buf.extend_from_slice(class.name.as_bytes());
        buf.push(0);
    }
    Ok(buf)
}

fn encode_values(values: &[ValueEntry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for entry in values {
        varint::encode_into(&mut buf, entry.key_index);
        buf.push(entry.value.value_type().as_u8());
        match &entry.value {
            Value::Byte(v) => buf.push(*v),
            Value::Short(v) => buf.write_u16::<LittleEndian>(*v)?,
            Value::Long(v) => buf.write_u32::<LittleEndian>(*v)?,
            Value::LongLong(v) => buf.write_i64::<LittleEndian>(*v)?,
            Value::False | Value::True | Value::Nil => {}
            Value::Float(v) => buf.write_f32::<LittleEndian>(*v)?,
            Value::Double(v) => buf.write_f64::<LittleEndian>(*v)?,
            Value::Data(bytes) => {
                varint::encode_into(&mut buf, to_u32(bytes.len(), "data length")?);
                buf.extend_from_slice(bytes);
            }
            Value::Object(idx) => buf.write_u32::<LittleEndian>(*idx)?,
        }
    }
    Ok(buf)
}

/// Flex numbers and header words hold at most 31/32 bits.
fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v < 1 << 31)
        .ok_or_else(|| Error::corrupt(format!("{what} {value} does not fit the archive format")))
}
