// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe definitions
//!
//! A recipe declares inputs/outputs, defaults, variables, assignments,
//! aliases, an optional for-loop, and ordered steps.

use crate::{RecipeError, Step};
use convoy_config::Value;
use convoy_schema::{parse_schema_set, SchemaSet};
use indexmap::IndexMap;

/// For-loop declaration: run the recipe body once per element of
/// `over`, binding `var` in recipe scope.
#[derive(Debug, Clone)]
pub struct ForLoop {
    pub var: String,
    /// A literal list, or the name of a list-valued recipe input.
    pub over: Value,
    /// Concurrent iterations: 0/1 serial, N > 1 bounded, -1 unbounded.
    pub scatter: i64,
    /// Status template substituted per iteration for progress display.
    pub display_status: Option<String>,
}

/// A named workflow of ordered steps.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub info: Option<String>,
    pub inputs: SchemaSet,
    pub outputs: SchemaSet,
    pub defaults: IndexMap<String, Value>,
    /// Recipe-scope variables, also assignable via `assign`.
    pub vars: IndexMap<String, Value>,
    /// Assignments evaluated at prevalidation and re-evaluated per step
    /// and per loop iteration.
    pub assign: IndexMap<String, Value>,
    /// `input-or-var -> observed-value -> sub-assignments`; `DEFAULT`
    /// is the fallback case.
    pub assign_based_on: IndexMap<String, IndexMap<String, IndexMap<String, Value>>>,
    /// The dedicated aliases section: alias name → target list.
    pub aliases: IndexMap<String, Vec<String>>,
    pub for_loop: Option<ForLoop>,
    pub steps: Vec<Step>,
    /// Backend preference subtree for all steps of this recipe.
    pub backend: Option<Value>,
}

impl Recipe {
    /// Parse a recipe definition (`lib.recipes.<name>` or inline).
    pub fn parse(name: &str, value: &Value) -> Result<Recipe, RecipeError> {
        let bad = |message: String| RecipeError::Definition {
            name: name.to_string(),
            message,
        };
        let map = value
            .as_map()
            .ok_or_else(|| bad(format!("expected a mapping, got {}", value.kind())))?;

        let inputs = match map.get("inputs") {
            Some(section) => parse_schema_set(section)?,
            None => SchemaSet::new(),
        };
        let outputs = match map.get("outputs") {
            Some(section) => parse_schema_set(section)?,
            None => SchemaSet::new(),
        };

        let steps = match map.get("steps") {
            Some(Value::Map(step_map)) => step_map
                .iter()
                .map(|(label, step_value)| Step::parse(label, step_value))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(bad(format!("steps must be a mapping, got {}", other.kind())))
            }
            None => Vec::new(),
        };

        let aliases = match map.get("aliases") {
            Some(Value::Map(alias_map)) => {
                let mut aliases = IndexMap::new();
                for (alias_name, targets) in alias_map {
                    let targets = match targets {
                        Value::Str(one) => vec![one.clone()],
                        Value::List(items) => items
                            .iter()
                            .map(|item| {
                                item.as_str().map(str::to_string).ok_or_else(|| {
                                    bad(format!(
                                        "alias '{alias_name}' target must be a string"
                                    ))
                                })
                            })
                            .collect::<Result<_, _>>()?,
                        other => {
                            return Err(bad(format!(
                                "alias '{alias_name}' must be a string or list, got {}",
                                other.kind()
                            )))
                        }
                    };
                    aliases.insert(alias_name.clone(), targets);
                }
                aliases
            }
            _ => IndexMap::new(),
        };

        let for_loop = match map.get("for_loop") {
            Some(section) => Some(parse_for_loop(name, section)?),
            None => None,
        };

        Ok(Recipe {
            name: name.to_string(),
            info: map.get("info").and_then(Value::as_str).map(str::to_string),
            inputs,
            outputs,
            defaults: plain_map(map.get("defaults")),
            vars: plain_map(map.get("vars")),
            assign: plain_map(map.get("assign")),
            assign_based_on: parse_assign_based_on(name, map.get("assign_based_on"))?,
            aliases,
            for_loop,
            steps,
            backend: map.get("backend").cloned(),
        })
    }

    pub fn get_step(&self, label: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.label == label)
    }

    /// Read-only structured description for the documentation
    /// collaborator: inputs, outputs and the step tree.
    pub fn describe(&self) -> Value {
        let mut tree = Value::empty_map();
        if let Some(info) = &self.info {
            tree.set_path("info", Value::from(info.clone()));
        }
        for (section, set) in [("inputs", &self.inputs), ("outputs", &self.outputs)] {
            for (name, schema) in set {
                let mut entry = Value::empty_map();
                entry.set_path("dtype", Value::from(schema.dtype.to_string()));
                if let Some(info) = &schema.info {
                    entry.set_path("info", Value::from(info.clone()));
                }
                if let Some(default) = &schema.default {
                    entry.set_path("default", default.clone());
                }
                entry.set_path(
                    "category",
                    Value::from(format!("{:?}", schema.effective_category())),
                );
                tree.set_path(&format!("{section}.{name}"), entry);
            }
        }
        for step in &self.steps {
            let mut entry = Value::empty_map();
            let target = match &step.target {
                crate::StepTarget::Cab(name) => format!("cab:{name}"),
                crate::StepTarget::Recipe(name) => format!("recipe:{name}"),
                crate::StepTarget::InlineCab(cab) => format!("cab:{}", cab.name),
                crate::StepTarget::InlineRecipe(recipe) => format!("recipe:{}", recipe.name),
            };
            entry.set_path("target", Value::from(target));
            if let Some(info) = &step.info {
                entry.set_path("info", Value::from(info.clone()));
            }
            tree.set_path(&format!("steps.{}", step.label), entry);
        }
        tree
    }
}

fn plain_map(value: Option<&Value>) -> IndexMap<String, Value> {
    match value {
        Some(Value::Map(map)) => map.clone(),
        _ => IndexMap::new(),
    }
}

fn parse_for_loop(recipe: &str, section: &Value) -> Result<ForLoop, RecipeError> {
    let bad = |message: String| RecipeError::Definition {
        name: recipe.to_string(),
        message,
    };
    let map = section
        .as_map()
        .ok_or_else(|| bad(format!("for_loop must be a mapping, got {}", section.kind())))?;
    let var = map
        .get("var")
        .and_then(Value::as_str)
        .ok_or_else(|| bad("for_loop needs a 'var'".to_string()))?
        .to_string();
    let over = map
        .get("over")
        .cloned()
        .ok_or_else(|| bad("for_loop needs 'over'".to_string()))?;
    if !matches!(over, Value::List(_) | Value::Str(_)) {
        return Err(bad(format!(
            "for_loop 'over' must be a list or an input name, got {}",
            over.kind()
        )));
    }
    let scatter = match map.get("scatter") {
        None => 0,
        Some(Value::Int(n)) => *n,
        Some(Value::Bool(true)) => -1,
        Some(Value::Bool(false)) => 0,
        Some(other) => {
            return Err(bad(format!("scatter must be an integer, got {}", other.kind())))
        }
    };
    Ok(ForLoop {
        var,
        over,
        scatter,
        display_status: map
            .get("display_status")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_assign_based_on(
    recipe: &str,
    value: Option<&Value>,
) -> Result<IndexMap<String, IndexMap<String, IndexMap<String, Value>>>, RecipeError> {
    let mut out = IndexMap::new();
    let Some(value) = value else {
        return Ok(out);
    };
    let bad = |message: String| RecipeError::Definition {
        name: recipe.to_string(),
        message,
    };
    let map = value
        .as_map()
        .ok_or_else(|| bad(format!("assign_based_on must be a mapping, got {}", value.kind())))?;
    for (key, cases_value) in map {
        let cases_map = cases_value.as_map().ok_or_else(|| {
            bad(format!("assign_based_on.{key} must be a mapping of cases"))
        })?;
        let mut cases = IndexMap::new();
        for (case, assignments) in cases_map {
            let assignments = assignments.as_map().ok_or_else(|| {
                bad(format!(
                    "assign_based_on.{key}.{case} must be a mapping of assignments"
                ))
            })?;
            cases.insert(case.clone(), assignments.clone());
        }
        out.insert(key.clone(), cases);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "recipe_tests.rs"]
mod tests;
