// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive deep merge of configuration trees

use crate::{ConfigError, Value};

/// Deep-merge `from` into `into`.
///
/// Mappings merge key-wise, recursing into shared keys. Non-mapping values
/// are overwritten by the later document. Replacing a mapping with a
/// non-mapping (or the reverse) is a structural conflict and fails with
/// [`ConfigError::MergeConflict`] naming the offending path.
pub fn merge(into: &mut Value, from: Value) -> Result<(), ConfigError> {
    merge_at(into, from, &mut Vec::new())
}

fn merge_at(
    into: &mut Value,
    from: Value,
    path: &mut Vec<String>,
) -> Result<(), ConfigError> {
    match (&mut *into, from) {
        (Value::Map(existing), Value::Map(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => {
                        path.push(key);
                        merge_at(slot, value, path)?;
                        path.pop();
                    }
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
            Ok(())
        }
        // A null slot accepts anything; an incoming null leaves the
        // existing value in place so includes can declare keys without
        // clobbering bodies.
        (Value::Null, incoming) => {
            *into = incoming;
            Ok(())
        }
        (_, Value::Null) => Ok(()),
        (Value::Map(_), incoming) => Err(ConfigError::MergeConflict {
            path: path.join("."),
            existing: "mapping",
            incoming: incoming.kind(),
        }),
        (existing, incoming @ Value::Map(_)) => Err(ConfigError::MergeConflict {
            path: path.join("."),
            existing: existing.kind(),
            incoming: incoming.kind(),
        }),
        (existing, incoming) => {
            *existing = incoming;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
