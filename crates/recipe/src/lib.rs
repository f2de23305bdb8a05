// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cab and recipe models
//!
//! A **cab** is an atomic task: a flavour (binary, task-runner, callable,
//! inline code), input/output schemas, argv policies and output wranglers,
//! able to turn bound parameters into an [`InvocationPlan`]. A **recipe**
//! is a composite workflow of ordered steps with its own inputs, outputs,
//! variables, aliases and optional for-loop. Prevalidation wires the two
//! together before anything runs.

mod alias;
mod cab;
mod error;
mod plan;
mod policies;
mod prevalidate;
mod recipe;
mod step;
mod wrangler;

pub use alias::{build_aliases, Alias, AliasTarget};
pub use cab::{Cab, CabFlavour, ImageRef, Management};
pub use error::RecipeError;
pub use plan::{InvocationPlan, Mount, OutputFile, RESULT_MARKER};
pub use policies::{build_argv, split_command, Policies};
pub use prevalidate::{
    apply_assign_based_on, apply_assignments, prevalidate, recipe_scope, Prevalidated, StepIo,
};
pub use recipe::{ForLoop, Recipe};
pub use step::{SkipIfOutputs, Step, StepTarget};
pub use wrangler::{Severity, WranglerAction, WranglerRule};

/// Bound parameter values, in schema declaration order.
pub type Bindings = indexmap::IndexMap<String, convoy_config::Value>;
