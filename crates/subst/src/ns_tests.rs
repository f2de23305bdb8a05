// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use convoy_config::Value;

fn tree(yaml: &str) -> Value {
    Value::from_yaml(serde_yaml::from_str(yaml).unwrap())
}

fn stack() -> NsStack {
    let mut ns = NsStack::new();
    ns.push("recipe", tree("{ms: foo.ms, band: L}"));
    ns.push(
        "steps",
        tree(
            r#"
image-1: {out: a.fits}
image-2: {out: b.fits}
calibrate: {gain: 0.1}
"#,
        ),
    );
    ns
}

#[test]
fn scope_plus_path_lookup() {
    let ns = stack();
    assert_eq!(ns.lookup("recipe.ms"), Some(Value::from("foo.ms")));
    assert_eq!(ns.lookup("steps.calibrate.gain"), Some(Value::Float(0.1)));
}

#[test]
fn missing_scope_or_path_is_none() {
    let ns = stack();
    assert_eq!(ns.lookup("nowhere.x"), None);
    assert_eq!(ns.lookup("recipe.missing"), None);
}

#[test]
fn bare_scope_name_returns_whole_tree() {
    let ns = stack();
    assert!(ns.lookup("recipe").is_some_and(|v| v.is_map()));
}

#[test]
fn inner_scope_shadows_outer() {
    let mut ns = stack();
    ns.push("recipe", tree("{ms: inner.ms}"));
    assert_eq!(ns.lookup("recipe.ms"), Some(Value::from("inner.ms")));
}

#[test]
fn set_replaces_innermost() {
    let mut ns = stack();
    ns.set("recipe", tree("{ms: replaced.ms}"));
    assert_eq!(ns.lookup("recipe.ms"), Some(Value::from("replaced.ms")));
}

#[test]
fn wildcard_picks_largest_matching_label() {
    let ns = stack();
    // image-1 and image-2 both match; alphanumerically largest wins
    assert_eq!(ns.lookup("steps.image-*.out"), Some(Value::from("b.fits")));
    assert_eq!(ns.lookup("steps.image-?.out"), Some(Value::from("b.fits")));
}

#[test]
fn wildcard_with_no_match_is_none() {
    let ns = stack();
    assert_eq!(ns.lookup("steps.selfcal-*.out"), None);
}

#[test]
fn index_suffixes_walk_lists() {
    let t = tree("{files: [a, b, c], nested: [[1, 2], [3]]}");
    assert_eq!(lookup_in_tree(&t, "files[0]"), Some(Value::from("a")));
    assert_eq!(lookup_in_tree(&t, "files[-1]"), Some(Value::from("c")));
    assert_eq!(lookup_in_tree(&t, "nested[1][0]"), Some(Value::Int(3)));
    assert_eq!(lookup_in_tree(&t, "files[9]"), None);
}

#[test]
fn numeric_path_segment_indexes_lists() {
    let t = tree("{files: [a, b]}");
    assert_eq!(lookup_in_tree(&t, "files.1"), Some(Value::from("b")));
}
