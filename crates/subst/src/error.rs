// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for substitution and formula evaluation

use thiserror::Error;

/// Errors that can occur while evaluating substitutions and formulas
#[derive(Debug, Error)]
pub enum SubstError {
    #[error("unresolved substitution: {{{name}}}")]
    Unresolved { name: String },

    #[error("'{name}' is unset in expression")]
    UnsetInExpression { name: String },

    #[error("formula syntax error in '{expr}': {message}")]
    Syntax { expr: String, message: String },

    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("bad argument to {function}: {message}")]
    BadArgumentType { function: String, message: String },

    #[error("bad format spec ':{spec}'")]
    BadFormat { spec: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("type error: {message}")]
    TypeError { message: String },
}
