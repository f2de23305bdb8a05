// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the end-to-end specs

use convoy_config::{reparent_top_level, Value};
use convoy_engine::{Engine, RunLog};
use convoy_recipe::Bindings;

/// Parse a YAML document into a configuration tree with top-level
/// reparenting applied.
pub fn config(yaml: &str) -> Value {
    let mut tree = Value::from_yaml(serde_yaml::from_str(yaml).expect("valid test YAML"));
    reparent_top_level(&mut tree);
    tree
}

/// Parse a YAML mapping into parameter bindings.
pub fn bindings(yaml: &str) -> Bindings {
    match Value::from_yaml(serde_yaml::from_str(yaml).expect("valid test YAML")) {
        Value::Map(map) => map,
        other => panic!("expected a mapping, got {}", other.kind()),
    }
}

/// An engine wired to a capturing log sink.
pub fn engine() -> (Engine, RunLog) {
    let log = RunLog::with_capture();
    (Engine::new().with_log(log.clone()), log)
}

/// The text of every captured log line.
pub fn logged_lines(log: &RunLog) -> Vec<String> {
    log.captured().into_iter().map(|(_, _, line)| line).collect()
}
