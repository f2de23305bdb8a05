// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Substitution strings and formula evaluation
//!
//! Two string grammars drive parameter values:
//!
//! - **Substitution strings**: `{namespace.path:spec}` occurrences are
//!   replaced by formatted namespace lookups; `{{` escapes a literal brace.
//! - **Formulas**: a value beginning with `=` is parsed as an expression
//!   (`==` escapes a literal leading `=`). Formulas preserve value types;
//!   substitutions always produce strings.
//!
//! Both evaluate against an ordered [`NsStack`] of named scopes.

mod error;
mod eval;
mod format;
mod funcs;
mod lexer;
mod ns;
mod parser;
mod subst;

pub use error::SubstError;
pub use eval::{eval, Evaluated};
pub use format::apply_format;
pub use lexer::{tokenize, Token};
pub use ns::{lookup_in_tree, NsStack, Scope};
pub use parser::{parse_formula, BinOp, Expr, UnOp};
pub use subst::{evaluate_params, evaluate_string, evaluate_value, substitute};
