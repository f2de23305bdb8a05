// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Formula evaluation
//!
//! Evaluates a parsed [`Expr`] against a namespace stack. A lookup that
//! resolves nowhere is not an error by itself — it produces
//! [`Evaluated::Unset`], and only becomes [`SubstError::UnsetInExpression`]
//! when the value is needed by an operator. `IF`/`IFSET` observe unsetness
//! without forcing it.

use crate::parser::{BinOp, Expr, UnOp};
use crate::{funcs, NsStack, SubstError};
use convoy_config::Value;

/// The result of evaluating a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Value(Value),
    /// An unset result: either the `UNSET` sentinel (`name: None`) or a
    /// lookup that resolved nowhere (`name: Some(path)`).
    Unset { name: Option<String> },
}

impl Evaluated {
    /// Force a concrete value, failing with `UnsetInExpression` otherwise.
    pub fn into_value(self) -> Result<Value, SubstError> {
        match self {
            Evaluated::Value(v) => Ok(v),
            Evaluated::Unset { name } => Err(SubstError::UnsetInExpression {
                name: name.unwrap_or_else(|| "UNSET".to_string()),
            }),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Evaluated::Unset { .. })
    }
}

/// Evaluate a formula against the namespace stack.
pub fn eval(expr: &Expr, ns: &NsStack) -> Result<Evaluated, SubstError> {
    match expr {
        Expr::Int(i) => Ok(Evaluated::Value(Value::Int(*i))),
        Expr::Float(f) => Ok(Evaluated::Value(Value::Float(*f))),
        Expr::Str(s) => {
            // String literals inside formulas undergo substitution.
            let substituted = crate::subst::substitute(s, ns)?;
            Ok(Evaluated::Value(Value::Str(substituted)))
        }
        Expr::Bool(b) => Ok(Evaluated::Value(Value::Bool(*b))),
        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(item, ns)?.into_value()?);
            }
            Ok(Evaluated::Value(Value::List(values)))
        }
        Expr::Lookup(path) => Ok(resolve_lookup(path, ns)),
        Expr::Index { base, index } => {
            let base = eval(base, ns)?.into_value()?;
            let index = eval(index, ns)?.into_value()?;
            apply_index(&base, &index).map(Evaluated::Value)
        }
        Expr::Unary { op, expr } => {
            let value = eval(expr, ns)?.into_value()?;
            apply_unary(*op, value).map(Evaluated::Value)
        }
        Expr::Binary { lhs, op, rhs } => eval_binary(lhs, *op, rhs, ns),
        Expr::Call { func, args } => match func.as_str() {
            "IF" => eval_if(func, args, ns),
            "IFSET" => eval_ifset(func, args, ns),
            _ => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(eval(arg, ns)?);
                }
                funcs::call(func, evaluated, ns)
            }
        },
    }
}

fn resolve_lookup(path: &str, ns: &NsStack) -> Evaluated {
    match path {
        "UNSET" => Evaluated::Unset { name: None },
        "EMPTY" => Evaluated::Value(Value::Str(String::new())),
        _ => match ns.lookup(path) {
            Some(value) => Evaluated::Value(value),
            None => Evaluated::Unset {
                name: Some(path.to_string()),
            },
        },
    }
}

fn eval_if(func: &str, args: &[Expr], ns: &NsStack) -> Result<Evaluated, SubstError> {
    if !(3..=4).contains(&args.len()) {
        return Err(SubstError::BadArgumentType {
            function: func.to_string(),
            message: format!("expected 3 or 4 arguments, got {}", args.len()),
        });
    }
    let cond = eval(&args[0], ns)?;
    match cond {
        Evaluated::Unset { name } => match args.get(3) {
            Some(if_unset) => eval(if_unset, ns),
            None => Err(SubstError::UnsetInExpression {
                name: name.unwrap_or_else(|| "UNSET".to_string()),
            }),
        },
        Evaluated::Value(v) => {
            if v.truthy() {
                eval(&args[1], ns)
            } else {
                eval(&args[2], ns)
            }
        }
    }
}

fn eval_ifset(func: &str, args: &[Expr], ns: &NsStack) -> Result<Evaluated, SubstError> {
    if args.is_empty() || args.len() > 3 {
        return Err(SubstError::BadArgumentType {
            function: func.to_string(),
            message: format!("expected 1 to 3 arguments, got {}", args.len()),
        });
    }
    let probe = eval(&args[0], ns)?;
    match probe {
        Evaluated::Value(value) => match args.get(1) {
            Some(set_expr) => eval(set_expr, ns),
            None => Ok(Evaluated::Value(value)),
        },
        Evaluated::Unset { .. } => match args.get(2) {
            Some(unset_expr) => eval(unset_expr, ns),
            None => Ok(Evaluated::Unset { name: None }),
        },
    }
}

fn eval_binary(
    lhs: &Expr,
    op: BinOp,
    rhs: &Expr,
    ns: &NsStack,
) -> Result<Evaluated, SubstError> {
    // Logical operators short-circuit.
    if op == BinOp::And {
        let left = eval(lhs, ns)?.into_value()?;
        if !left.truthy() {
            return Ok(Evaluated::Value(Value::Bool(false)));
        }
        let right = eval(rhs, ns)?.into_value()?;
        return Ok(Evaluated::Value(Value::Bool(right.truthy())));
    }
    if op == BinOp::Or {
        let left = eval(lhs, ns)?.into_value()?;
        if left.truthy() {
            return Ok(Evaluated::Value(Value::Bool(true)));
        }
        let right = eval(rhs, ns)?.into_value()?;
        return Ok(Evaluated::Value(Value::Bool(right.truthy())));
    }

    let left = eval(lhs, ns)?.into_value()?;
    let right = eval(rhs, ns)?.into_value()?;
    apply_binop(op, left, right).map(Evaluated::Value)
}

fn type_error(op: &str, l: &Value, r: &Value) -> SubstError {
    SubstError::TypeError {
        message: format!("cannot apply '{op}' to {} and {}", l.kind(), r.kind()),
    }
}

fn apply_binop(op: BinOp, l: Value, r: Value) -> Result<Value, SubstError> {
    use BinOp::*;
    match op {
        Eq => Ok(Value::Bool(values_equal(&l, &r))),
        Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        Lt | Le | Gt | Ge => {
            let ordering = compare(&l, &r).ok_or_else(|| type_error("compare", &l, &r))?;
            let result = match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        In => contains(&r, &l).map(Value::Bool),
        NotIn => contains(&r, &l).map(|c| Value::Bool(!c)),
        Add => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.clone());
                Ok(Value::List(out))
            }
            _ => numeric(&l, &r, |a, b| a + b).ok_or_else(|| type_error("+", &l, &r)),
        },
        Sub => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            _ => numeric(&l, &r, |a, b| a - b).ok_or_else(|| type_error("-", &l, &r)),
        },
        Mul => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            _ => numeric(&l, &r, |a, b| a * b).ok_or_else(|| type_error("*", &l, &r)),
        },
        Div => {
            let denominator = r.as_float().ok_or_else(|| type_error("/", &l, &r))?;
            if denominator == 0.0 {
                return Err(SubstError::DivisionByZero);
            }
            numeric(&l, &r, |a, b| a / b).ok_or_else(|| type_error("/", &l, &r))
        }
        FloorDiv => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(SubstError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.div_euclid(*b)))
                }
            }
            _ => {
                if r.as_float() == Some(0.0) {
                    return Err(SubstError::DivisionByZero);
                }
                numeric(&l, &r, |a, b| (a / b).floor()).ok_or_else(|| type_error("//", &l, &r))
            }
        },
        Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(SubstError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.rem_euclid(*b)))
                }
            }
            _ => numeric(&l, &r, |a, b| a % b).ok_or_else(|| type_error("%", &l, &r)),
        },
        Pow => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) if *b >= 0 => {
                match u32::try_from(*b).ok().and_then(|e| a.checked_pow(e)) {
                    Some(result) => Ok(Value::Int(result)),
                    None => Ok(Value::Float((*a as f64).powf(*b as f64))),
                }
            }
            _ => numeric(&l, &r, f64::powf).ok_or_else(|| type_error("**", &l, &r)),
        },
        BitOr => ints(&l, &r, |a, b| a | b).ok_or_else(|| type_error("|", &l, &r)),
        BitXor => ints(&l, &r, |a, b| a ^ b).ok_or_else(|| type_error("^", &l, &r)),
        BitAnd => ints(&l, &r, |a, b| a & b).ok_or_else(|| type_error("&", &l, &r)),
        Shl => ints(&l, &r, |a, b| a << b).ok_or_else(|| type_error("<<", &l, &r)),
        Shr => ints(&l, &r, |a, b| a >> b).ok_or_else(|| type_error(">>", &l, &r)),
        And | Or => unreachable!("logical operators short-circuit in eval_binary"),
    }
}

fn numeric(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    match (l.as_float(), r.as_float()) {
        (Some(a), Some(b)) => Some(Value::Float(f(a, b))),
        _ => None,
    }
}

fn ints(l: &Value, r: &Value, f: impl Fn(i64, i64) -> i64) -> Option<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(Value::Int(f(*a, *b))),
        _ => None,
    }
}

/// Equality with int/float cross-coercion.
pub(crate) fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => l.as_float()?.partial_cmp(&r.as_float()?),
    }
}

fn contains(container: &Value, needle: &Value) -> Result<bool, SubstError> {
    match container {
        Value::List(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Str(haystack) => match needle {
            Value::Str(sub) => Ok(haystack.contains(sub.as_str())),
            _ => Err(type_error("in", needle, container)),
        },
        Value::Map(map) => match needle {
            Value::Str(key) => Ok(map.contains_key(key)),
            _ => Err(type_error("in", needle, container)),
        },
        _ => Err(type_error("in", needle, container)),
    }
}

fn apply_unary(op: UnOp, value: Value) -> Result<Value, SubstError> {
    match op {
        UnOp::Not => Ok(Value::Bool(!value.truthy())),
        UnOp::Neg => match value {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(SubstError::TypeError {
                message: format!("cannot negate {}", other.kind()),
            }),
        },
    }
}

fn apply_index(base: &Value, index: &Value) -> Result<Value, SubstError> {
    let fail = || SubstError::TypeError {
        message: format!("cannot index {} with {}", base.kind(), index.kind()),
    };
    match (base, index) {
        (Value::List(items), Value::Int(i)) => {
            let len = items.len() as i64;
            let i = if *i < 0 { len + i } else { *i };
            items
                .get(usize::try_from(i).map_err(|_| fail())?)
                .cloned()
                .ok_or_else(|| SubstError::TypeError {
                    message: format!("list index {i} out of range (len {len})"),
                })
        }
        (Value::Map(map), Value::Str(key)) => {
            map.get(key).cloned().ok_or_else(|| SubstError::TypeError {
                message: format!("no such key '{key}'"),
            })
        }
        _ => Err(fail()),
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
