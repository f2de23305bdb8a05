// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in formula functions
//!
//! `IF` and `IFSET` are handled by the evaluator (they observe unsetness);
//! everything here receives eagerly evaluated arguments.

use crate::{Evaluated, NsStack, SubstError};
use convoy_config::Value;
use std::path::{Path, PathBuf};

pub(crate) fn call(
    func: &str,
    args: Vec<Evaluated>,
    ns: &NsStack,
) -> Result<Evaluated, SubstError> {
    let values = force_all(func, args)?;
    let result = match func {
        "GLOB" => glob_fn(func, &values, ns)?,
        "EXISTS" => exists_fn(func, &values, ns)?,
        "MIN" => min_max(func, values, false)?,
        "MAX" => min_max(func, values, true)?,
        "LIST" => Value::List(values),
        "RANGE" => range_fn(func, &values)?,
        "DIRNAME" => path_fn(func, &values, |p| {
            p.parent().map(|d| d.display().to_string()).unwrap_or_default()
        })?,
        "BASENAME" => path_fn(func, &values, |p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })?,
        "EXTENSION" => path_fn(func, &values, |p| {
            p.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default()
        })?,
        "STRIPEXT" => path_fn(func, &values, |p| {
            p.with_extension("").display().to_string()
        })?,
        _ => {
            return Err(SubstError::UnknownFunction {
                name: func.to_string(),
            })
        }
    };
    Ok(Evaluated::Value(result))
}

fn force_all(func: &str, args: Vec<Evaluated>) -> Result<Vec<Value>, SubstError> {
    args.into_iter()
        .map(|arg| match arg {
            Evaluated::Value(v) => Ok(v),
            Evaluated::Unset { name } => Err(SubstError::UnsetInExpression {
                name: name.unwrap_or_else(|| format!("argument of {func}")),
            }),
        })
        .collect()
}

fn one_string<'a>(func: &str, values: &'a [Value]) -> Result<&'a str, SubstError> {
    match values {
        [Value::Str(s)] => Ok(s),
        [other] => Err(SubstError::BadArgumentType {
            function: func.to_string(),
            message: format!("expected a string, got {}", other.kind()),
        }),
        _ => Err(SubstError::BadArgumentType {
            function: func.to_string(),
            message: format!("expected 1 argument, got {}", values.len()),
        }),
    }
}

/// Resolve a possibly-relative path against the stack's base directory.
fn based(ns: &NsStack, path: &str) -> PathBuf {
    let p = Path::new(path);
    match ns.base_dir() {
        Some(base) if p.is_relative() => base.join(p),
        _ => p.to_path_buf(),
    }
}

fn glob_fn(func: &str, values: &[Value], ns: &NsStack) -> Result<Value, SubstError> {
    let pattern = one_string(func, values)?;
    let full = based(ns, pattern).display().to_string();
    let walker = glob::glob(&full).map_err(|e| SubstError::BadArgumentType {
        function: func.to_string(),
        message: format!("bad glob pattern '{pattern}': {e}"),
    })?;
    let mut matches: Vec<String> = walker
        .filter_map(Result::ok)
        .map(|p| {
            // Report matches relative to the base dir when one is set.
            match ns.base_dir().and_then(|base| p.strip_prefix(base).ok()) {
                Some(rel) => rel.display().to_string(),
                None => p.display().to_string(),
            }
        })
        .collect();
    matches.sort();
    Ok(Value::List(matches.into_iter().map(Value::Str).collect()))
}

fn exists_fn(func: &str, values: &[Value], ns: &NsStack) -> Result<Value, SubstError> {
    let path = one_string(func, values)?;
    Ok(Value::Bool(based(ns, path).exists()))
}

fn min_max(func: &str, values: Vec<Value>, want_max: bool) -> Result<Value, SubstError> {
    // A single list argument is treated as the candidate set.
    let candidates = match values.as_slice() {
        [Value::List(items)] => items.clone(),
        _ => values,
    };
    if candidates.is_empty() {
        return Err(SubstError::BadArgumentType {
            function: func.to_string(),
            message: "expected at least one value".to_string(),
        });
    }
    let mut all_ints = true;
    let mut best: Option<(f64, Value)> = None;
    for value in candidates {
        let Some(numeric) = value.as_float() else {
            return Err(SubstError::BadArgumentType {
                function: func.to_string(),
                message: format!("expected numbers, got {}", value.kind()),
            });
        };
        if !matches!(value, Value::Int(_)) {
            all_ints = false;
        }
        let better = match &best {
            None => true,
            Some((current, _)) => {
                if want_max {
                    numeric > *current
                } else {
                    numeric < *current
                }
            }
        };
        if better {
            best = Some((numeric, value));
        }
    }
    let (numeric, value) = best.unwrap_or((0.0, Value::Int(0)));
    Ok(if all_ints { value } else { Value::Float(numeric) })
}

fn range_fn(func: &str, values: &[Value]) -> Result<Value, SubstError> {
    let arg_error = |message: String| SubstError::BadArgumentType {
        function: func.to_string(),
        message,
    };
    let ints: Vec<i64> = values
        .iter()
        .map(|v| {
            v.as_int()
                .ok_or_else(|| arg_error(format!("expected integers, got {}", v.kind())))
        })
        .collect::<Result<_, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [n] => (0, *n, 1),
        [a, b] => (*a, *b, 1),
        [a, b, s] => (*a, *b, *s),
        _ => return Err(arg_error(format!("expected 1 to 3 arguments, got {}", ints.len()))),
    };
    if step == 0 {
        return Err(arg_error("step must be non-zero".to_string()));
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(Value::Int(i));
        i += step;
    }
    Ok(Value::List(out))
}

fn path_fn(
    func: &str,
    values: &[Value],
    f: impl Fn(&Path) -> String,
) -> Result<Value, SubstError> {
    let path = one_string(func, values)?;
    Ok(Value::Str(f(Path::new(path))))
}

#[cfg(test)]
#[path = "funcs_tests.rs"]
mod tests;
