// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String substitution and the top-level value evaluation entry points

use crate::{apply_format, eval, parse_formula, Evaluated, NsStack, SubstError};
use convoy_config::Value;
use indexmap::IndexMap;

/// Replace every `{path:spec}` occurrence in `input` with a formatted
/// namespace lookup. `{{` and `}}` escape literal braces. An unresolvable
/// lookup fails with [`SubstError::Unresolved`].
pub fn substitute(input: &str, ns: &NsStack) -> Result<String, SubstError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut interior = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    interior.push(ch);
                }
                if !closed {
                    return Err(SubstError::Syntax {
                        expr: input.to_string(),
                        message: "unterminated substitution".to_string(),
                    });
                }
                let (path, spec) = match interior.split_once(':') {
                    Some((p, s)) => (p, s),
                    None => (interior.as_str(), ""),
                };
                let value = ns.lookup(path).ok_or_else(|| SubstError::Unresolved {
                    name: path.to_string(),
                })?;
                out.push_str(&apply_format(&value, spec)?);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                out.push('}');
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Evaluate one string value:
///
/// - `==rest` is the literal string `=rest`
/// - `=expr` parses and evaluates as a formula (type-preserving)
/// - anything else undergoes `{}` substitution and yields a string
pub fn evaluate_string(input: &str, ns: &NsStack) -> Result<Evaluated, SubstError> {
    if let Some(literal) = input.strip_prefix("==") {
        return Ok(Evaluated::Value(Value::Str(format!("={literal}"))));
    }
    if let Some(formula) = input.strip_prefix('=') {
        let parsed = parse_formula(formula)?;
        return eval(&parsed, ns);
    }
    substitute(input, ns).map(|s| Evaluated::Value(Value::Str(s)))
}

/// Recursively evaluate a parameter value. Returns `None` when the value
/// resolves to the `UNSET` sentinel or to an unset lookup — the caller
/// removes the binding.
pub fn evaluate_value(value: &Value, ns: &NsStack) -> Result<Option<Value>, SubstError> {
    match value {
        Value::Str(s) => match evaluate_string(s, ns)? {
            Evaluated::Value(v) => Ok(Some(v)),
            Evaluated::Unset { .. } => Ok(None),
        },
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                // Unset elements drop out of the list.
                if let Some(v) = evaluate_value(item, ns)? {
                    out.push(v);
                }
            }
            Ok(Some(Value::List(out)))
        }
        Value::Map(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                if let Some(v) = evaluate_value(item, ns)? {
                    out.insert(key.clone(), v);
                }
            }
            Ok(Some(Value::Map(out)))
        }
        other => Ok(Some(other.clone())),
    }
}

/// Evaluate a parameter map; bindings resolving to `UNSET` are removed.
pub fn evaluate_params(
    params: &IndexMap<String, Value>,
    ns: &NsStack,
) -> Result<IndexMap<String, Value>, SubstError> {
    let mut out = IndexMap::with_capacity(params.len());
    for (name, value) in params {
        match evaluate_value(value, ns)? {
            Some(v) => {
                out.insert(name.clone(), v);
            }
            None => {
                tracing::debug!(param = %name, "binding removed by UNSET");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "subst_tests.rs"]
mod tests;
