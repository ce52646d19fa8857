//! Integration tests for building, compiling and reading back archives.

use nibarchive::compare::CmpNode;
use nibarchive::graph::{ArrayClass, NibGraph, Number, PropValue};
use nibarchive::nib::{self, NibFile, Value, EMPTY_KEY, INLINED_VALUE_KEY};
use nibarchive::{lift, write_archive};

use tempfile::NamedTempFile;

#[test]
fn test_end_to_end_object_with_list() {
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let list = g.list([PropValue::Byte(1), PropValue::Byte(2)]);
    g.edit(root).expect("root exists").set("a", 1).set("b", list);

    let bytes = g.compile(&[root]).expect("Failed to compile");
    let sections = nib::decode(&bytes).expect("Failed to decode");
    let graph = lift(&sections).expect("Failed to lift");

    let root = graph.root();
    assert_eq!(graph.node(root).classname(), Some("NSObject"));

    let a = graph.entry(root, "a").expect("key a");
    let a = graph.node(a).as_value().expect("a is a value");
    assert_eq!(*a, Value::Byte(1));
    assert_eq!(a.value_type().as_u8(), 0x00);

    let b = graph.entry(root, "b").expect("key b");
    assert!(matches!(graph.node(b), CmpNode::Collection { .. }));
    let items: Vec<_> = graph
        .items(b)
        .expect("b is a collection")
        .iter()
        .map(|&id| graph.node(id).as_value().cloned())
        .collect();
    assert_eq!(items, [Some(Value::Byte(1)), Some(Value::Byte(2))]);
}

#[test]
fn test_compiled_sections_roundtrip() {
    let mut g = NibGraph::new();
    let root = g.object("NSIBObjectData");
    let title = g.mutable_string("Window");
    let number = g.number(Number::Double(0.25));
    let dict = g.dictionary_from_pairs([("width", 640), ("height", 480)]);
    let set = g.array(ArrayClass::MutableSet, [PropValue::Nil]);
    g.edit(root)
        .expect("root exists")
        .set("NSTitle", title)
        .set("NSAlpha", number)
        .set("NSSizes", dict)
        .set("NSSet", set)
        .set("NSName", "main")
        .set("NSBig", -70000)
        .set("NSFrame", [0.0, 0.0, 100.0, 50.0])
        .set("NSHidden", false);

    let bytes = g.compile(&[root]).expect("Failed to compile");
    let sections = nib::decode(&bytes).expect("Failed to decode");
    assert_eq!(nib::encode(&sections).expect("Failed to encode"), bytes);
    assert_eq!(sections.class_name(0), Some("NSIBObjectData"));
    println!("objects: {}, keys: {:?}", sections.objects.len(), sections.keys);

    // Each object owns one contiguous block of values, in order
    let mut next = 0;
    for obj in &sections.objects {
        assert_eq!(obj.first_value, next);
        next += obj.value_count;
    }
    assert_eq!(next as usize, sections.values.len());
}

#[test]
fn test_interned_strings_share_one_object() {
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let other = g.object("NSObject");
    g.edit(root).expect("root exists").set("first", "same").set("other", other);
    g.edit(other).expect("other exists").set("second", "same");

    let sections = nib::decode(&g.compile(&[root]).expect("Failed to compile")).expect("Failed to decode");
    let strings = (0..sections.objects.len())
        .filter(|&i| sections.class_name(i) == Some("NSString"))
        .count();
    assert_eq!(strings, 1);
    assert_eq!(sections.objects.len(), 3);
}

#[test]
fn test_cycle_compiles_and_closes() {
    let mut g = NibGraph::new();
    let a = g.object("NSView");
    let b = g.object("NSView");
    g.edit(a).expect("a exists").set("NSNextResponder", b);
    g.edit(b).expect("b exists").set("NSNextResponder", a);

    let bytes = g.compile(&[a]).expect("Failed to compile");
    let graph = lift(&nib::decode(&bytes).expect("Failed to decode")).expect("Failed to lift");

    let root = graph.root();
    let next = graph.entry(root, "NSNextResponder").expect("first hop");
    assert_ne!(next, root);
    assert_eq!(graph.entry(next, "NSNextResponder"), Some(root));
}

#[test]
fn test_list_sentinel_keys() {
    let mut g = NibGraph::new();
    let list = g.mutable_list(["x", "y"]);
    let sections = nib::decode(&g.compile(&[list]).expect("Failed to compile")).expect("Failed to decode");
    assert_eq!(sections.keys, [INLINED_VALUE_KEY, EMPTY_KEY]);
    let values: Vec<_> = sections.values.iter().map(|v| v.value.clone()).collect();
    assert_eq!(
        values,
        [Value::True, Value::Data(b"x".to_vec()), Value::Data(b"y".to_vec())]
    );
}

#[test]
fn test_file_roundtrip() {
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let label = g.string("Hello");
    g.edit(root).expect("root exists").set("label", label).set("count", 300);

    let bytes = g.compile(&[root]).expect("Failed to compile");
    let sections = nib::decode(&bytes).expect("Failed to decode");

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_archive(temp.path(), &sections).expect("Failed to write archive");

    for use_mmap in [true, false] {
        let file = NibFile::open_opts(temp.path(), use_mmap).expect("Failed to open archive");
        assert_eq!(file.bytes(), &bytes[..]);
        assert_eq!(file.sections().expect("Failed to read sections"), sections);
    }
}

#[test]
fn test_missing_file() {
    let err = NibFile::open("/nonexistent/path/file.nib").err().expect("open must fail");
    assert!(matches!(err, nibarchive::Error::FileNotFound(_)));
}
