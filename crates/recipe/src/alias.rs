// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alias construction
//!
//! An alias ties a recipe-level parameter to one or more step
//! parameters. Aliases come from three places, merged in order: the
//! dedicated `aliases:` section, `aliases:` attributes on input/output
//! schemas, and auto-aliases synthesised for every otherwise-unbound
//! step parameter. Targets support `*.param` and `(cabname).param`
//! wildcard forms.

use crate::prevalidate::StepIo;
use crate::{Recipe, RecipeError};
use convoy_schema::Schema;
use indexmap::IndexMap;

/// One step parameter an alias refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub step_label: String,
    pub param: String,
    pub is_output: bool,
}

/// A resolved alias.
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub schema: Schema,
    pub targets: Vec<AliasTarget>,
    pub is_output: bool,
    /// Synthesised for an unbound step parameter rather than declared.
    pub auto: bool,
}

/// Build the full alias table for a recipe.
pub fn build_aliases(
    recipe: &Recipe,
    step_io: &IndexMap<String, StepIo>,
) -> Result<IndexMap<String, Alias>, RecipeError> {
    let mut aliases: IndexMap<String, Alias> = IndexMap::new();

    // 1. The dedicated aliases: section
    for (name, target_specs) in &recipe.aliases {
        let alias = resolve_alias(recipe, step_io, name, target_specs, false)?;
        aliases.insert(name.clone(), alias);
    }

    // 2. aliases: attributes on recipe input/output schemas
    for (name, schema) in recipe.inputs.iter().chain(recipe.outputs.iter()) {
        if schema.aliases.is_empty() {
            continue;
        }
        if aliases.contains_key(name) {
            return Err(RecipeError::UnresolvedAlias {
                alias: name.clone(),
                message: "declared both in aliases section and on the schema".to_string(),
            });
        }
        let alias = resolve_alias(recipe, step_io, name, &schema.aliases, false)?;
        aliases.insert(name.clone(), alias);
    }

    // 3. Auto-aliases for unbound step parameters
    let targeted: Vec<AliasTarget> = aliases
        .values()
        .flat_map(|a| a.targets.iter().cloned())
        .collect();
    for step in &recipe.steps {
        let Some(io) = step_io.get(&step.label) else {
            continue;
        };
        for (param, schema) in io.inputs.iter().chain(io.outputs.iter()) {
            if step.params.contains_key(param) {
                continue;
            }
            let covered = targeted
                .iter()
                .any(|t| t.step_label == step.label && t.param == *param);
            if covered {
                continue;
            }
            let name = format!("{}.{}", step.label, param);
            if aliases.contains_key(&name) {
                continue;
            }
            let is_output = io.outputs.contains_key(param);
            aliases.insert(
                name.clone(),
                Alias {
                    name,
                    schema: schema.clone(),
                    targets: vec![AliasTarget {
                        step_label: step.label.clone(),
                        param: param.clone(),
                        is_output,
                    }],
                    is_output,
                    auto: true,
                },
            );
        }
    }

    Ok(aliases)
}

fn resolve_alias(
    recipe: &Recipe,
    step_io: &IndexMap<String, StepIo>,
    name: &str,
    target_specs: &[String],
    auto: bool,
) -> Result<Alias, RecipeError> {
    let fail = |message: String| RecipeError::UnresolvedAlias {
        alias: name.to_string(),
        message,
    };

    let mut targets = Vec::new();
    for spec in target_specs {
        targets.extend(expand_target(recipe, step_io, name, spec)?);
    }
    if targets.is_empty() {
        return Err(fail("no targets".to_string()));
    }

    let is_output = targets[0].is_output;
    if targets.iter().any(|t| t.is_output != is_output) {
        return Err(fail("targets mix step inputs and outputs".to_string()));
    }
    if is_output && targets.len() > 1 {
        return Err(fail(format!(
            "an output alias has exactly one target, got {}",
            targets.len()
        )));
    }

    // Conflicting explicit values at multiple targets are rejected here,
    // before any step-level assignment runs.
    let explicit: Vec<&convoy_config::Value> = targets
        .iter()
        .filter_map(|t| {
            recipe
                .get_step(&t.step_label)
                .and_then(|s| s.params.get(&t.param))
        })
        .collect();
    if explicit.len() > 1 && explicit.windows(2).any(|w| w[0] != w[1]) {
        return Err(fail(
            "targets carry conflicting explicit values".to_string(),
        ));
    }

    // Schema: declared on the recipe if present, else inferred from the
    // targets (which must agree on dtype).
    let declared = recipe.inputs.get(name).or_else(|| recipe.outputs.get(name));
    let target_schema = |t: &AliasTarget| -> Option<&Schema> {
        let io = step_io.get(&t.step_label)?;
        io.inputs.get(&t.param).or_else(|| io.outputs.get(&t.param))
    };
    let schema = match declared {
        Some(schema) => schema.clone(),
        None => {
            let first = target_schema(&targets[0])
                .ok_or_else(|| fail(format!("no schema for target {}", targets[0].param)))?;
            for t in &targets[1..] {
                let other = target_schema(t)
                    .ok_or_else(|| fail(format!("no schema for target {}", t.param)))?;
                if other.dtype != first.dtype {
                    return Err(fail(format!(
                        "target schemas disagree: {} vs {}",
                        first.dtype, other.dtype
                    )));
                }
            }
            first.clone()
        }
    };
    if let Some(declared) = declared {
        for t in &targets {
            if let Some(other) = target_schema(t) {
                if other.dtype != declared.dtype {
                    return Err(fail(format!(
                        "target '{}.{}' has dtype {}, alias declares {}",
                        t.step_label, t.param, other.dtype, declared.dtype
                    )));
                }
            }
        }
    }

    Ok(Alias {
        name: name.to_string(),
        schema,
        targets,
        is_output,
        auto,
    })
}

/// Expand one target spec: `label.param`, `*.param`, `lab*.param`, or
/// `(cabname).param`.
fn expand_target(
    recipe: &Recipe,
    step_io: &IndexMap<String, StepIo>,
    alias: &str,
    spec: &str,
) -> Result<Vec<AliasTarget>, RecipeError> {
    let fail = |message: String| RecipeError::UnresolvedAlias {
        alias: alias.to_string(),
        message,
    };
    let (selector, param) = spec
        .split_once('.')
        .ok_or_else(|| fail(format!("target '{spec}' is not of the form step.param")))?;

    let make = |label: &str, io: &StepIo| -> Option<AliasTarget> {
        if io.inputs.contains_key(param) {
            Some(AliasTarget {
                step_label: label.to_string(),
                param: param.to_string(),
                is_output: false,
            })
        } else if io.outputs.contains_key(param) {
            Some(AliasTarget {
                step_label: label.to_string(),
                param: param.to_string(),
                is_output: true,
            })
        } else {
            None
        }
    };

    // (cabname).param matches every step resolving to that cab
    if let Some(cab) = selector.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        let matched: Vec<AliasTarget> = recipe
            .steps
            .iter()
            .filter(|step| {
                step_io
                    .get(&step.label)
                    .and_then(|io| io.cab_name.as_deref())
                    == Some(cab)
            })
            .filter_map(|step| step_io.get(&step.label).and_then(|io| make(&step.label, io)))
            .collect();
        if matched.is_empty() {
            return Err(fail(format!("no step uses cab '{cab}' with parameter '{param}'")));
        }
        return Ok(matched);
    }

    // Wildcard label matches every step exposing the parameter
    if selector.contains('*') || selector.contains('?') {
        let pattern = glob_pattern(selector).map_err(|e| fail(e))?;
        let matched: Vec<AliasTarget> = recipe
            .steps
            .iter()
            .filter(|step| pattern.matches(&step.label))
            .filter_map(|step| step_io.get(&step.label).and_then(|io| make(&step.label, io)))
            .collect();
        if matched.is_empty() {
            return Err(fail(format!(
                "no step matching '{selector}' exposes parameter '{param}'"
            )));
        }
        return Ok(matched);
    }

    // Plain label
    let io = step_io
        .get(selector)
        .ok_or_else(|| fail(format!("no such step '{selector}'")))?;
    match make(selector, io) {
        Some(target) => Ok(vec![target]),
        None => Err(fail(format!(
            "step '{selector}' has no parameter '{param}'"
        ))),
    }
}

fn glob_pattern(selector: &str) -> Result<glob::Pattern, String> {
    glob::Pattern::new(selector).map_err(|e| format!("bad wildcard '{selector}': {e}"))
}

#[cfg(test)]
#[path = "alias_tests.rs"]
mod tests;
