// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe prevalidation
//!
//! Runs before any step does: marks caller-supplied inputs immune,
//! applies `assign` and `assign_based_on`, builds the alias table,
//! propagates values up from targets and typechecks recipe-level
//! inputs. The scheduler pushes alias values down into step params at
//! bind time.

use crate::{build_aliases, Alias, Bindings, Recipe, RecipeError, StepTarget};
use convoy_config::Value;
use convoy_schema::{typecheck, SchemaSet};
use convoy_subst::{evaluate_value, NsStack, SubstError};
use indexmap::IndexMap;
use std::collections::HashSet;

/// The input/output schemas a step's target exposes, plus the resolved
/// cab name for `(cabname).param` alias forms. Supplied by the engine,
/// which resolves cab and recipe references against the config tree.
#[derive(Debug, Clone, Default)]
pub struct StepIo {
    pub inputs: SchemaSet,
    pub outputs: SchemaSet,
    pub cab_name: Option<String>,
}

/// The result of prevalidation.
#[derive(Debug, Clone)]
pub struct Prevalidated {
    pub aliases: IndexMap<String, Alias>,
    /// Recipe-level parameter values: defaults, caller parameters,
    /// assignments and alias-propagated values, typechecked.
    pub values: Bindings,
    /// Recipe-scope variables after `assign`.
    pub vars: Bindings,
    /// Inputs explicitly set by the caller; never overwritten by
    /// assignments.
    pub immune: HashSet<String>,
}

/// Prevalidate a recipe against caller parameters.
pub fn prevalidate(
    recipe: &Recipe,
    params: &Bindings,
    step_io: &IndexMap<String, StepIo>,
    base_ns: &NsStack,
) -> Result<Prevalidated, RecipeError> {
    // Seed values: schema defaults, then the defaults section, then
    // caller parameters (which win and become immune).
    let mut values = Bindings::new();
    for (name, schema) in &recipe.inputs {
        if let Some(default) = &schema.default {
            values.insert(name.clone(), default.clone());
        }
    }
    for (name, value) in &recipe.defaults {
        values.insert(name.clone(), value.clone());
    }
    let mut immune = HashSet::new();
    for (name, value) in params {
        values.insert(name.clone(), value.clone());
        immune.insert(name.clone());
    }

    let mut vars = recipe.vars.clone();

    // Assignments may reference the loop variable; seed it with the
    // first element so prevalidation sees a representative binding.
    // Each iteration rebinds it before re-evaluating assignments.
    if let Some(for_loop) = &recipe.for_loop {
        if !vars.contains_key(&for_loop.var) {
            let seed = match &for_loop.over {
                Value::List(items) => items.first().cloned().unwrap_or(Value::Null),
                Value::Str(input) => values
                    .get(input)
                    .and_then(|v| v.as_list())
                    .and_then(|items| items.first().cloned())
                    .unwrap_or(Value::Null),
                other => other.clone(),
            };
            vars.insert(for_loop.var.clone(), seed);
        }
    }

    apply_assignments(
        recipe,
        &recipe.assign,
        &mut values,
        &mut vars,
        &immune,
        base_ns,
    )?;
    apply_assign_based_on(recipe, &mut values, &mut vars, &immune, base_ns)?;

    let aliases = build_aliases(recipe, step_io)?;

    // Propagate values up: a recipe input with no value takes the first
    // explicit or defaulted value found among its alias targets.
    for alias in aliases.values() {
        if alias.is_output || values.contains_key(&alias.name) {
            continue;
        }
        let found = alias.targets.iter().find_map(|target| {
            let step = recipe.get_step(&target.step_label)?;
            if let Some(explicit) = step.params.get(&target.param) {
                return Some(explicit.clone());
            }
            step_io
                .get(&target.step_label)?
                .inputs
                .get(&target.param)?
                .default
                .clone()
        });
        if let Some(value) = found {
            tracing::debug!(alias = %alias.name, "propagating value up from alias target");
            values.insert(alias.name.clone(), value);
        }
    }

    // Typecheck recipe-level inputs.
    for (name, schema) in &recipe.inputs {
        if let Some(value) = values.get(name) {
            let checked = typecheck(name, value, schema)?;
            values.insert(name.clone(), checked);
        } else if schema.required {
            return Err(RecipeError::UnresolvedParameter {
                step: recipe.name.clone(),
                param: name.clone(),
            });
        }
    }

    // Every required step parameter must be resolvable from somewhere.
    check_required_step_params(recipe, step_io, &aliases, &values, &vars)?;

    Ok(Prevalidated {
        aliases,
        values,
        vars,
        immune,
    })
}

/// Apply an assignment block. Keys naming recipe inputs set values
/// (unless immune); other keys set recipe-scope variables. Values that
/// reference not-yet-available namespaces (step results) stay raw and
/// are re-evaluated at step time.
pub fn apply_assignments(
    recipe: &Recipe,
    assign: &IndexMap<String, Value>,
    values: &mut Bindings,
    vars: &mut Bindings,
    immune: &HashSet<String>,
    base_ns: &NsStack,
) -> Result<(), RecipeError> {
    for (key, raw) in assign {
        if immune.contains(key) {
            tracing::debug!(key, "assign skipped: input is immune");
            continue;
        }
        let mut ns = base_ns.clone();
        ns.push("recipe", recipe_scope(values, vars));
        let value = match evaluate_assignment(raw, &ns) {
            Assigned::Value(v) => v,
            Assigned::Unset => {
                values.shift_remove(key);
                vars.shift_remove(key);
                continue;
            }
            Assigned::Deferred => raw.clone(),
            Assigned::Failed(e) => return Err(e.into()),
        };
        if recipe.inputs.contains_key(key) {
            values.insert(key.clone(), value);
        } else {
            vars.insert(key.clone(), value);
        }
    }
    Ok(())
}

enum Assigned {
    Value(Value),
    Unset,
    /// References a step-scoped namespace not available before the
    /// scheduler runs; keep the raw value for re-evaluation at step
    /// time.
    Deferred,
    Failed(SubstError),
}

/// A lookup path that only resolves once steps are executing.
fn is_step_scoped(path: &str) -> bool {
    ["steps.", "previous.", "current.", "info."]
        .iter()
        .any(|scope| path.starts_with(scope))
}

fn evaluate_assignment(raw: &Value, ns: &NsStack) -> Assigned {
    if let Value::Str(text) = raw {
        return match convoy_subst::evaluate_string(text, ns) {
            Ok(convoy_subst::Evaluated::Value(v)) => Assigned::Value(v),
            Ok(convoy_subst::Evaluated::Unset { name: None }) => Assigned::Unset,
            Ok(convoy_subst::Evaluated::Unset { name: Some(path) }) => {
                if is_step_scoped(&path) {
                    Assigned::Deferred
                } else {
                    Assigned::Unset
                }
            }
            Err(SubstError::Unresolved { ref name }) if is_step_scoped(name) => {
                Assigned::Deferred
            }
            Err(SubstError::UnsetInExpression { ref name }) if is_step_scoped(name) => {
                Assigned::Deferred
            }
            Err(e) => Assigned::Failed(e),
        };
    }
    match evaluate_value(raw, ns) {
        Ok(Some(v)) => Assigned::Value(v),
        Ok(None) => Assigned::Unset,
        Err(SubstError::Unresolved { ref name }) if is_step_scoped(name) => Assigned::Deferred,
        Err(SubstError::UnsetInExpression { ref name }) if is_step_scoped(name) => {
            Assigned::Deferred
        }
        Err(e) => Assigned::Failed(e),
    }
}

/// Apply the `assign_based_on` chains: each key's observed value picks
/// a case (or `DEFAULT`) whose sub-assignments are applied in turn.
/// Re-evaluated at prevalidation and at the start of every loop
/// iteration.
pub fn apply_assign_based_on(
    recipe: &Recipe,
    values: &mut Bindings,
    vars: &mut Bindings,
    immune: &HashSet<String>,
    base_ns: &NsStack,
) -> Result<(), RecipeError> {
    for (key, cases) in &recipe.assign_based_on {
        let observed = values
            .get(key)
            .or_else(|| vars.get(key))
            .map(Value::to_string)
            .unwrap_or_default();
        let assignments = cases
            .get(&observed)
            .or_else(|| cases.get("DEFAULT"))
            .ok_or_else(|| RecipeError::AssignBasedOnUnmatched {
                key: key.clone(),
                value: observed.clone(),
            })?;
        tracing::debug!(key, observed, "assign_based_on case selected");
        apply_assignments(recipe, assignments, values, vars, immune, base_ns)?;
    }
    Ok(())
}

/// Merge recipe values and variables into the `recipe` namespace scope.
pub fn recipe_scope(values: &Bindings, vars: &Bindings) -> Value {
    let mut merged = values.clone();
    for (k, v) in vars {
        merged.insert(k.clone(), v.clone());
    }
    Value::Map(merged)
}

fn check_required_step_params(
    recipe: &Recipe,
    step_io: &IndexMap<String, StepIo>,
    aliases: &IndexMap<String, Alias>,
    values: &Bindings,
    vars: &Bindings,
) -> Result<(), RecipeError> {
    for step in &recipe.steps {
        // Sub-recipes check their own inputs when they prevalidate.
        if matches!(step.target, StepTarget::Recipe(_) | StepTarget::InlineRecipe(_)) {
            continue;
        }
        let Some(io) = step_io.get(&step.label) else {
            continue;
        };
        for (param, schema) in &io.inputs {
            if !schema.required {
                continue;
            }
            if step.params.contains_key(param)
                || schema.default.is_some()
                || schema.implicit.is_some()
                || vars.contains_key(param)
            {
                continue;
            }
            // Covered by an alias that has (or will receive) a value?
            let aliased = aliases.values().any(|alias| {
                alias
                    .targets
                    .iter()
                    .any(|t| t.step_label == step.label && t.param == *param)
                    && (values.contains_key(&alias.name)
                        || alias.schema.default.is_some()
                        || alias.schema.implicit.is_some())
            });
            if !aliased {
                return Err(RecipeError::UnresolvedParameter {
                    step: step.label.clone(),
                    param: param.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "prevalidate_tests.rs"]
mod tests;
