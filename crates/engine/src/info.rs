// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `info` namespace: step identity exposed to substitutions

use convoy_config::Value;

/// Build the `info` scope for a step: `label`, `label_parts` (split on
/// `-`), `suffix` (the last dash-component, or empty), `fqname`, and
/// `taskname` (the fqname including loop counters).
pub fn step_info(label: &str, fqname: &str, taskname: &str) -> Value {
    let parts: Vec<Value> = label.split('-').map(Value::from).collect();
    let suffix = match label.rsplit_once('-') {
        Some((_, suffix)) => suffix.to_string(),
        None => String::new(),
    };
    let mut info = Value::empty_map();
    info.set_path("label", Value::from(label));
    info.set_path("label_parts", Value::List(parts));
    info.set_path("suffix", Value::from(suffix));
    info.set_path("fqname", Value::from(fqname));
    info.set_path("taskname", Value::from(taskname));
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashed_label_splits() {
        let info = step_info("image-field-1", "demo.image-field-1", "demo.image-field-1");
        assert_eq!(
            info.get_path("label").and_then(Value::as_str),
            Some("image-field-1")
        );
        assert_eq!(
            info.get_path("label_parts.0").and_then(Value::as_str),
            Some("image")
        );
        assert_eq!(info.get_path("suffix").and_then(Value::as_str), Some("1"));
    }

    #[test]
    fn plain_label_has_empty_suffix() {
        let info = step_info("calibrate", "demo.calibrate", "demo.calibrate.1");
        assert_eq!(info.get_path("suffix").and_then(Value::as_str), Some(""));
        assert_eq!(
            info.get_path("taskname").and_then(Value::as_str),
            Some("demo.calibrate.1")
        );
    }
}
