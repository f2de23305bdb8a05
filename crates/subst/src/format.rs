// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format specs for substitution strings
//!
//! Supports the subset of Python-style specs recipes actually use:
//! `{x:02d}`, `{x:8s}`, `{x:.3f}`, `{x:x}`, `{x:o}`, `{x:b}`.

use crate::SubstError;
use convoy_config::Value;

/// Apply a format spec (the text after `:` in a substitution) to a value.
pub fn apply_format(value: &Value, spec: &str) -> Result<String, SubstError> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }

    let bad = || SubstError::BadFormat {
        spec: spec.to_string(),
    };

    let mut rest = spec;
    let zero_pad = rest.starts_with('0') && rest.len() > 1;
    if zero_pad {
        rest = &rest[1..];
    }

    let width_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let width: usize = if width_len > 0 {
        rest[..width_len].parse().map_err(|_| bad())?
    } else {
        0
    };
    rest = &rest[width_len..];

    let mut precision = None;
    if let Some(after_dot) = rest.strip_prefix('.') {
        let prec_len = after_dot.chars().take_while(|c| c.is_ascii_digit()).count();
        if prec_len == 0 {
            return Err(bad());
        }
        precision = Some(after_dot[..prec_len].parse::<usize>().map_err(|_| bad())?);
        rest = &after_dot[prec_len..];
    }

    let kind = match rest {
        "" => {
            if precision.is_some() {
                'f'
            } else {
                's'
            }
        }
        "d" | "s" | "f" | "x" | "o" | "b" => rest.chars().next().unwrap_or('s'),
        _ => return Err(bad()),
    };

    match kind {
        'd' => {
            let i = int_of(value).ok_or_else(bad)?;
            Ok(if zero_pad {
                format!("{:0width$}", i, width = width)
            } else {
                format!("{:width$}", i, width = width)
            })
        }
        'f' => {
            let f = value.as_float().ok_or_else(bad)?;
            let prec = precision.unwrap_or(6);
            Ok(if zero_pad {
                format!("{:0width$.prec$}", f, width = width, prec = prec)
            } else {
                format!("{:width$.prec$}", f, width = width, prec = prec)
            })
        }
        'x' => Ok(format!("{:x}", int_of(value).ok_or_else(bad)?)),
        'o' => Ok(format!("{:o}", int_of(value).ok_or_else(bad)?)),
        'b' => Ok(format!("{:b}", int_of(value).ok_or_else(bad)?)),
        _ => {
            // 's': left-justified in the given width
            let text = value.to_string();
            Ok(format!("{:<width$}", text, width = width))
        }
    }
}

/// Integer view for `d`/`x`/`o`/`b` specs; numeric strings coerce.
fn int_of(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
