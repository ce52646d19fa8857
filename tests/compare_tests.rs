//! Integration tests for the semantic differ on compiled archives.

use nibarchive::compare::{compare_sections, CmpGraph, IssueKind};
use nibarchive::graph::{NibGraph, ObjectId};
use nibarchive::nib;
use nibarchive::{compare, lift};

/// Compile `roots` of `g` and lift the result.
fn lifted(g: &NibGraph, root: ObjectId) -> CmpGraph {
    let bytes = g.compile(&[root]).expect("Failed to compile");
    lift(&nib::decode(&bytes).expect("Failed to decode")).expect("Failed to lift")
}

/// `NSObject { key: value }`
fn single(key: &str, value: i64) -> CmpGraph {
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    g.edit(root).expect("root exists").set(key, value);
    lifted(&g, root)
}

/// Window -> content view -> superview chain that loops back to the window.
fn cyclic_window() -> CmpGraph {
    let mut g = NibGraph::new();
    let window = g.object("NSWindowTemplate");
    let view = g.child_object("NSView", window);
    let button = g.child_object("NSButton", view);
    let subviews = g.mutable_list([button]);
    g.edit(window).expect("window").set("NSWindowView", view).set("NSWindowTitle", "Main");
    g.edit(view)
        .expect("view")
        .set("NSSubviews", subviews)
        .set("NSNextResponder", window)
        .set("NSvFlags", 0x100);
    g.edit(button)
        .expect("button")
        .set("NSSuperview", view)
        .set("NSNextResponder", view);
    lifted(&g, window)
}

#[test]
fn test_identical_cyclic_graphs() {
    let left = cyclic_window();
    let right = cyclic_window();
    let issues: Vec<_> = compare(&left, &right).collect();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");

    // Comparing a graph with itself terminates too
    assert_eq!(compare(&left, &left).count(), 0);
}

#[test]
fn test_cycle_one_level_deeper() {
    // Left: root -> a, a loops onto itself
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let a = g.object("NSView");
    g.edit(root).expect("root").set("child", a);
    g.edit(a).expect("a").set("next", a);
    let left = lifted(&g, root);

    // Right: root -> a -> b, b loops onto itself
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let a = g.object("NSView");
    let b = g.object("NSView");
    g.edit(root).expect("root").set("child", a);
    g.edit(a).expect("a").set("next", b);
    g.edit(b).expect("b").set("next", b);
    let right = lifted(&g, root);

    let issues: Vec<_> = compare(&left, &right).collect();
    assert_eq!(issues.len(), 1, "issues: {issues:?}");
    assert_eq!(issues[0].kind, IssueKind::CycleMismatch);
    assert_eq!(issues[0].to_string(), "child->next: cycle to different places");
}

#[test]
fn test_value_mismatch_in_decimal() {
    let issues: Vec<_> = compare(&single("NSTag", 1), &single("NSTag", 2)).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].kind,
        IssueKind::ValueMismatch {
            left: "1".into(),
            right: "2".into()
        }
    );
    assert_eq!(issues[0].to_string(), "NSTag (in NSObject): difference 1 != 2");
}

#[test]
fn test_value_mismatch_flags_in_hex() {
    let issues: Vec<_> = compare(&single("NSvFlags", 0x100), &single("NSvFlags", 0x200)).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].to_string(),
        "NSvFlags (in NSObject): difference 0x100 != 0x200"
    );
}

#[test]
fn test_class_mismatch_stops_descent() {
    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let child = g.object("NSButton");
    g.edit(root).expect("root").set("view", child);
    g.edit(child).expect("child").set("NSTag", 1);
    let left = lifted(&g, root);

    let mut g = NibGraph::new();
    let root = g.object("NSObject");
    let child = g.object("NSSlider");
    g.edit(root).expect("root").set("view", child);
    g.edit(child).expect("child").set("NSTag", 2);
    let right = lifted(&g, root);

    let issues: Vec<_> = compare(&left, &right).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].to_string(),
        "view (in NSObject): class name doesn't match NSButton != NSSlider"
    );
}

#[test]
fn test_object_against_collection_is_kind_mismatch() {
    let mut g = NibGraph::new();
    let root = g.object("NSView");
    let sub = g.object("NSView");
    g.edit(root).expect("root").set("sub", sub);
    let left = lifted(&g, root);

    let mut g = NibGraph::new();
    let root = g.object("NSView");
    let sub = g.list([1]);
    g.edit(root).expect("root").set("sub", sub);
    let right = lifted(&g, root);

    let issues: Vec<_> = compare(&left, &right).collect();
    assert_eq!(issues.len(), 1, "issues: {issues:?}");
    assert_eq!(
        issues[0].kind,
        IssueKind::KindMismatch {
            left: "object",
            right: "collection"
        }
    );
    assert_eq!(
        issues[0].to_string(),
        "sub (in NSView): types don't match object != collection"
    );
}

#[test]
fn test_length_mismatch_then_elements() {
    let build = |items: &[i64]| {
        let mut g = NibGraph::new();
        let root = g.object("NSView");
        let list = g.list(items.iter().copied());
        g.edit(root).expect("root").set("NSSubviews", list);
        lifted(&g, root)
    };
    let issues: Vec<_> = compare(&build(&[1, 2, 3]), &build(&[1, 5])).collect();
    let lines: Vec<_> = issues.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        [
            "NSSubviews mismatched length: 3 != 2",
            "NSSubviews->1 (in NSArray): difference 2 != 5",
        ]
    );
}

/// `NSIBObjectData` holding connectors labelled in the given order.
fn connections(labels: &[&str]) -> CmpGraph {
    let mut g = NibGraph::new();
    let root = g.object("NSIBObjectData");
    let connectors: Vec<_> = labels
        .iter()
        .map(|label| g.object_with("NSNibOutletConnector", [("NSLabel", *label)]))
        .collect();
    let list = g.mutable_list(connectors);
    g.edit(root).expect("root").set("NSConnections", list);
    lifted(&g, root)
}

#[test]
fn test_connections_are_unordered() {
    let left = connections(&["delegate", "dataSource", "window"]);
    let right = connections(&["window", "delegate", "dataSource"]);
    assert_eq!(compare(&left, &right).count(), 0);
}

/// View holding constraints with the given first attributes, in order.
fn constraints(attributes: &[i64], key: &str) -> CmpGraph {
    let mut g = NibGraph::new();
    let view = g.object("NSView");
    let items: Vec<_> = attributes
        .iter()
        .map(|&attr| g.object_with("NSLayoutConstraint", [("NSFirstAttribute", attr)]))
        .collect();
    let list = g.mutable_list(items);
    g.edit(view).expect("view").set(key, list);
    lifted(&g, view)
}

#[test]
fn test_constraints_are_unordered() {
    let left = constraints(&[3, 7, 1], "NSViewConstraints");
    let right = constraints(&[7, 1, 3], "NSViewConstraints");
    assert_eq!(compare(&left, &right).count(), 0);

    // The same lists under an ordinary key compare positionally
    let left = constraints(&[3, 7, 1], "NSOtherConstraints");
    let right = constraints(&[7, 1, 3], "NSOtherConstraints");
    assert_eq!(compare(&left, &right).count(), 3);
}

#[test]
fn test_missing_keys_both_sides() {
    let mut g = NibGraph::new();
    let root = g.object("NSView");
    g.edit(root).expect("root").set("NSTag", 4).set("NSvFlags", 0x12);
    let left = lifted(&g, root);

    let mut g = NibGraph::new();
    let root = g.object("NSView");
    g.edit(root).expect("root").set("NSTag", 4).set("NSHidden", true);
    let right = lifted(&g, root);

    let lines: Vec<_> = compare(&left, &right).map(|i| i.to_string()).collect();
    assert_eq!(
        lines,
        [
            " LHS (NSView) missing key NSHidden, RHS true (type 5)",
            " RHS (NSView) missing key NSvFlags, LHS 0x12",
        ]
    );
}

#[test]
fn test_compare_sections_fresh_per_call() {
    let left = nib::decode(
        &{
            let mut g = NibGraph::new();
            let root = g.object("NSObject");
            g.edit(root).expect("root").set("NSTag", 1);
            g.compile(&[root]).expect("Failed to compile")
        },
    )
    .expect("Failed to decode");
    let right = nib::decode(
        &{
            let mut g = NibGraph::new();
            let root = g.object("NSObject");
            g.edit(root).expect("root").set("NSTag", 9);
            g.compile(&[root]).expect("Failed to compile")
        },
    )
    .expect("Failed to decode");

    let first = compare_sections(&left, &right).expect("Failed to compare");
    let second = compare_sections(&left, &right).expect("Failed to compare");
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}
