// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value checking and coercion
//!
//! Coerces string representations where a unique parse exists (`"5"` to
//! an integer, `"[1, 2]"` to a list) and rejects everything else with
//! [`SchemaError::TypeMismatch`].

use crate::{DType, Schema, SchemaError};
use convoy_config::Value;
use indexmap::IndexMap;

/// Check `value` against `schema`, returning the (possibly coerced)
/// value. Choices and element choices are enforced after coercion.
pub fn typecheck(name: &str, value: &Value, schema: &Schema) -> Result<Value, SchemaError> {
    let coerced = coerce(name, value, &schema.dtype)?;

    if !schema.choices.is_empty() && !schema.choices.iter().any(|c| loose_eq(c, &coerced)) {
        return Err(SchemaError::BadChoice {
            name: name.to_string(),
            value: coerced.to_string(),
        });
    }
    if !schema.element_choices.is_empty() {
        if let Value::List(items) = &coerced {
            for item in items {
                if !schema.element_choices.iter().any(|c| loose_eq(c, item)) {
                    return Err(SchemaError::BadChoice {
                        name: name.to_string(),
                        value: item.to_string(),
                    });
                }
            }
        }
    }
    Ok(coerced)
}

fn mismatch(name: &str, dtype: &DType, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        name: name.to_string(),
        expected: dtype.to_string(),
        actual: format!("{} ({})", value.kind(), value),
    }
}

fn coerce(name: &str, value: &Value, dtype: &DType) -> Result<Value, SchemaError> {
    match dtype {
        DType::Str => match value {
            Value::Str(_) => Ok(value.clone()),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
                Ok(Value::Str(value.to_string()))
            }
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::Int => match value {
            Value::Int(_) => Ok(value.clone()),
            Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| mismatch(name, dtype, value)),
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::Float => match value {
            Value::Float(_) => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(name, dtype, value)),
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(mismatch(name, dtype, value)),
            },
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::File | DType::Directory | DType::MS | DType::URI => match value {
            Value::Str(_) => Ok(value.clone()),
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::List(element) => match value {
            Value::List(items) => {
                let coerced = items
                    .iter()
                    .map(|item| coerce(name, item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(coerced))
            }
            // A flow-style string parses if it reads back as a list
            Value::Str(s) if s.trim_start().starts_with('[') => {
                let parsed: serde_yaml::Value = serde_yaml::from_str(s)
                    .map_err(|_| mismatch(name, dtype, value))?;
                match Value::from_yaml(parsed) {
                    list @ Value::List(_) => coerce(name, &list, dtype),
                    _ => Err(mismatch(name, dtype, value)),
                }
            }
            // Scalars promote to a single-element list
            other => Ok(Value::List(vec![coerce(name, other, element)?])),
        },
        DType::Tuple(elements) => match value {
            Value::List(items) if items.len() == elements.len() => {
                let coerced = items
                    .iter()
                    .zip(elements)
                    .map(|(item, element)| coerce(name, item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(coerced))
            }
            _ => Err(mismatch(name, dtype, value)),
        },
        DType::Union(variants) => variants
            .iter()
            .find_map(|variant| coerce(name, value, variant).ok())
            .ok_or_else(|| mismatch(name, dtype, value)),
        DType::Optional(inner) => match value {
            Value::Null => Ok(Value::Null),
            other => coerce(name, other, inner),
        },
        DType::Dict(key_type, value_type) => match value {
            Value::Map(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    // Keys are strings in the tree; check they parse as
                    // the declared key type.
                    coerce(name, &Value::Str(k.clone()), key_type)?;
                    out.insert(k.clone(), coerce(name, v, value_type)?);
                }
                Ok(Value::Map(out))
            }
            _ => Err(mismatch(name, dtype, value)),
        },
    }
}

/// Choice comparison: string representations of scalars compare equal
/// to their typed forms, so `choices: [DATA, CORRECTED]` accepts both.
fn loose_eq(choice: &Value, value: &Value) -> bool {
    choice == value || choice.to_string() == value.to_string()
}

#[cfg(test)]
#[path = "typecheck_tests.rs"]
mod tests;
