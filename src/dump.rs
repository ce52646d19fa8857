//! Text and JSON renderings of decoded archives.
//!
//! The flat listing prints every object in archive order; the tree listing
//! starts at object 0 and expands references in place. Archives embedded
//! in `NS.bytes` payloads are decoded and listed one level deeper.

use std::io::Write;

use serde_json::{json, Value as Json};

use crate::nib::{self, has_magic, parse_header, Sections, Value, ValueEntry, BYTES_KEY};
use crate::util::{Error, Result};

/// Payloads shorter than this are never treated as embedded archives.
const MIN_EMBEDDED_LEN: usize = 40;

/// Rendering switches for the text listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Print the type tag before each value
    pub show_encoding: bool,
    /// Order each object's values by key name
    pub sort_keys: bool,
}

/// Header word, section counts and offsets of an archive.
pub fn write_info(out: &mut impl Write, bytes: &[u8]) -> Result<()> {
    let header = parse_header(bytes)?;
    writeln!(out, "Format word: {}", header.format_word)?;
    writeln!(out, "Header words: {}", header.header_words)?;
    for (name, (count, offset)) in ["objects", "keys", "values", "classes"]
        .iter()
        .zip(header.sections.iter())
    {
        writeln!(out, "{name:>8}: {count:>6} at offset {offset}")?;
    }
    writeln!(out, "Total size: {} bytes", bytes.len())?;
    Ok(())
}

/// Flat listing of every object.
pub fn write_flat(out: &mut impl Write, sections: &Sections, opts: DumpOptions) -> Result<()> {
    flat(out, sections, opts, "")
}

fn flat(out: &mut impl Write, sections: &Sections, opts: DumpOptions, prefix: &str) -> Result<()> {
    for index in 0..sections.objects.len() {
        writeln!(out, "{prefix}{index:3}: {}", class_of(sections, index)?)?;
        for entry in values_of(sections, index, opts)? {
            let key = key_of(sections, entry)?;
            if let Some(embedded) = embedded_archive(key, &entry.value) {
                writeln!(out, "{prefix}\t{key} = Encoded NIB Archive")?;
                flat(out, &nib::decode(embedded)?, opts, &format!("{prefix}\t"))?;
            } else {
                write_value(out, prefix, key, &entry.value, opts)?;
            }
        }
    }
    Ok(())
}

/// Tree listing from object 0; an object is not expanded twice on one branch.
pub fn write_tree(out: &mut impl Write, sections: &Sections, opts: DumpOptions) -> Result<()> {
    if sections.objects.is_empty() {
        return Ok(());
    }
    let mut branch = Vec::new();
    tree(out, sections, opts, 0, "", &mut branch)
}

fn tree(
    out: &mut impl Write,
    sections: &Sections,
    opts: DumpOptions,
    index: usize,
    prefix: &str,
    branch: &mut Vec<usize>,
) -> Result<()> {
    branch.push(index);
    writeln!(out, "{prefix}{}", class_of(sections, index)?)?;
    for entry in values_of(sections, index, opts)? {
        let key = key_of(sections, entry)?;
        match &entry.value {
            Value::Object(target) if !branch.contains(&(*target as usize)) => {
                if *target as usize >= sections.objects.len() {
                    return Err(Error::UnresolvedReference {
                        index: *target,
                        count: sections.objects.len(),
                    });
                }
                if opts.show_encoding {
                    writeln!(out, "{prefix}\t{key} = ({})", entry.value.value_type().as_u8())?;
                } else {
                    writeln!(out, "{prefix}\t{key} =")?;
                }
                tree(out, sections, opts, *target as usize, &format!("{prefix}\t"), branch)?;
            }
            value => match embedded_archive(key, value) {
                Some(embedded) => {
                    writeln!(out, "{prefix}\t{key} = Encoded NIB Archive")?;
                    flat(out, &nib::decode(embedded)?, opts, &format!("{prefix}\t"))?;
                }
                None => write_value(out, prefix, key, value, opts)?,
            },
        }
    }
    branch.pop();
    Ok(())
}

fn write_value(out: &mut impl Write, prefix: &str, key: &str, value: &Value, opts: DumpOptions) -> Result<()> {
    if opts.show_encoding {
        writeln!(out, "{prefix}\t{key} = ({}) {value}", value.value_type().as_u8())?;
    } else {
        writeln!(out, "{prefix}\t{key} = {value}")?;
    }
    Ok(())
}

/// Payload of an `NS.bytes` value that holds a whole archive.
fn embedded_archive<'v>(key: &str, value: &'v Value) -> Option<&'v [u8]> {
    let bytes = value.as_bytes()?;
    (key == BYTES_KEY && bytes.len() > MIN_EMBEDDED_LEN && has_magic(bytes)).then_some(bytes)
}

fn class_of(sections: &Sections, index: usize) -> Result<&str> {
    sections
        .class_name(index)
        .ok_or_else(|| Error::corrupt(format!("object {index} has no class")))
}

fn key_of<'s>(sections: &'s Sections, entry: &ValueEntry) -> Result<&'s str> {
    sections.key_of(entry).ok_or(Error::UnresolvedKey {
        index: entry.key_index,
        count: sections.keys.len(),
    })
}

fn values_of(sections: &Sections, index: usize, opts: DumpOptions) -> Result<Vec<&ValueEntry>> {
    let mut values: Vec<_> = sections
        .values_of(index)
        .ok_or_else(|| Error::corrupt(format!("object {index} values out of range")))?
        .iter()
        .collect();
    if opts.sort_keys {
        values.sort_by_key(|v| sections.key_of(v).unwrap_or_default());
    }
    Ok(values)
}

// ============================================================================
// JSON
// ============================================================================

/// Decoded sections as JSON.
pub fn to_json(sections: &Sections) -> Json {
    let objects: Vec<Json> = sections
        .objects
        .iter()
        .enumerate()
        .map(|(index, obj)| {
            let values: Vec<Json> = sections
                .values_of(index)
                .unwrap_or_default()
                .iter()
                .map(|entry| {
                    json!({
                        "key": sections.key_of(entry),
                        "type": entry.value.value_type().as_u8(),
                        "value": value_json(&entry.value),
                    })
                })
                .collect();
            json!({
                "index": index,
                "class": sections.class_name(index),
                "first_value": obj.first_value,
                "value_count": obj.value_count,
                "values": values,
            })
        })
        .collect();

    let classes: Vec<Json> = sections
        .classes
        .iter()
        .map(|c| json!({ "name": c.name, "extra": c.extra }))
        .collect();

    json!({
        "objects": objects,
        "keys": sections.keys,
        "classes": classes,
    })
}

/// Write the JSON rendering of `sections`, pretty-printed.
pub fn write_json(out: &mut impl Write, sections: &Sections) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, &to_json(sections))?;
    writeln!(out)?;
    Ok(())
}

fn value_json(value: &Value) -> Json {
    match value {
        Value::Byte(v) => json!(v),
        Value::Short(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::LongLong(v) => json!(v),
        Value::False => json!(false),
        Value::True => json!(true),
        Value::Float(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Data(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => json!(text),
            Err(_) => json!(bytes),
        },
        Value::Nil => Json::Null,
        Value::Object(idx) => json!({ "ref": idx }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nib::{ClassEntry, ObjectEntry};

    /// Root with a title and a self-referencing child.
    fn sample() -> Sections {
        Sections {
            objects: vec![ObjectEntry::new(0, 0, 2), ObjectEntry::new(1, 2, 2)],
            keys: vec!["title".into(), "child".into(), "parent".into(), "tag".into()],
            values: vec![
                ValueEntry::new(1, Value::Object(1)),
                ValueEntry::new(0, Value::Data(b"Hi".to_vec())),
                ValueEntry::new(3, Value::Byte(7)),
                ValueEntry::new(2, Value::Object(0)),
            ],
            classes: vec![ClassEntry::new("NSWindow"), ClassEntry::new("NSView")],
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_flat() {
        let text = render(|out| write_flat(out, &sample(), DumpOptions::default()));
        assert_eq!(
            text,
            "  0: NSWindow\n\tchild = @1\n\ttitle = \"Hi\"\n  1: NSView\n\ttag = 7\n\tparent = @0\n"
        );
    }

    #[test]
    fn test_flat_sorted_with_encoding() {
        let opts = DumpOptions {
            show_encoding: true,
            sort_keys: true,
        };
        let text = render(|out| write_flat(out, &sample(), opts));
        assert!(text.contains("  1: NSView\n\tparent = (10) @0\n\ttag = (0) 7\n"));
    }

    #[test]
    fn test_tree_stops_on_branch_repeat() {
        let text = render(|out| write_tree(out, &sample(), DumpOptions::default()));
        assert_eq!(
            text,
            "NSWindow\n\tchild =\n\tNSView\n\t\ttag = 7\n\t\tparent = @0\n\ttitle = \"Hi\"\n"
        );
    }

    #[test]
    fn test_embedded_archive() -> Result<()> {
        let inner = nib::encode(&sample())?;
        let outer = Sections {
            objects: vec![ObjectEntry::new(0, 0, 1)],
            keys: vec![BYTES_KEY.into()],
            values: vec![ValueEntry::new(0, Value::Data(inner))],
            classes: vec![ClassEntry::new("NSData")],
        };
        let text = render(|out| write_flat(out, &outer, DumpOptions::default()));
        assert!(text.starts_with("  0: NSData\n\tNS.bytes = Encoded NIB Archive\n\t  0: NSWindow\n"));
        Ok(())
    }

    #[test]
    fn test_info() -> Result<()> {
        let bytes = nib::encode(&sample())?;
        let text = render(|out| write_info(out, &bytes));
        assert!(text.starts_with("Format word: 1\nHeader words: 9\n"));
        assert!(text.contains(" objects:      2 at offset 50\n"));
        Ok(())
    }

    #[test]
    fn test_json() {
        let j = to_json(&sample());
        assert_eq!(j["objects"][0]["class"], "NSWindow");
        assert_eq!(j["objects"][0]["values"][0]["value"]["ref"], 1);
        assert_eq!(j["objects"][1]["values"][0]["value"], 7);
        assert_eq!(j["keys"][0], "title");
    }

    #[test]
    fn test_write_json() -> Result<()> {
        let text = render(|out| write_json(out, &sample()));
        let parsed: Json = serde_json::from_str(&text)?;
        assert_eq!(parsed, to_json(&sample()));
        assert!(text.ends_with("}\n"));
        Ok(())
    }

    /// Writer whose every write fails.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_json_reports_failure() {
        let err = write_json(&mut Broken, &sample()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
