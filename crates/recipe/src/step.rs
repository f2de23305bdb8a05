// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step definitions
//!
//! A step invokes a cab or a sub-recipe, by reference or inline:
//!
//! ```yaml
//! steps:
//!   image-1:
//!     cab: wsclean
//!     params: {ms: foo.ms}
//!     tags: [imaging]
//!   selfcal:
//!     recipe: selfcal-loop
//!     skip: "=recipe.skip_selfcal"
//! ```

use crate::{Cab, Recipe, RecipeError};
use convoy_config::Value;
use indexmap::IndexMap;

/// What a step invokes.
#[derive(Debug, Clone)]
pub enum StepTarget {
    /// Reference to `cabs.<name>`.
    Cab(String),
    /// Reference to `lib.recipes.<name>`.
    Recipe(String),
    /// Cab defined inline on the step.
    InlineCab(Box<Cab>),
    /// Sub-recipe defined inline on the step.
    InlineRecipe(Box<Recipe>),
}

/// Output-based skip conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipIfOutputs {
    /// Skip when every required file output already exists.
    Exist,
    /// Skip when outputs exist and are at least as new as the newest
    /// input.
    Fresh,
}

/// One ordered child of a recipe.
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub target: StepTarget,
    pub params: IndexMap<String, Value>,
    pub tags: Vec<String>,
    /// Boolean or substitution string; truthy means skip.
    pub skip: Option<Value>,
    pub skip_if_outputs: Option<SkipIfOutputs>,
    /// Step-scoped assignments, active only while this step runs.
    pub assign: IndexMap<String, Value>,
    /// Backend preference subtree for this step.
    pub backend: Option<Value>,
    pub info: Option<String>,
}

impl Step {
    /// Parse a `steps.<label>` entry.
    pub fn parse(label: &str, value: &Value) -> Result<Step, RecipeError> {
        let bad = |message: String| RecipeError::Definition {
            name: label.to_string(),
            message,
        };
        let map = value
            .as_map()
            .ok_or_else(|| bad(format!("expected a mapping, got {}", value.kind())))?;

        let target = match (map.get("cab"), map.get("recipe")) {
            (Some(_), Some(_)) => {
                return Err(bad("step cannot name both a cab and a recipe".to_string()))
            }
            (Some(Value::Str(name)), None) => StepTarget::Cab(name.clone()),
            (Some(inline @ Value::Map(_)), None) => {
                StepTarget::InlineCab(Box::new(Cab::parse(label, inline)?))
            }
            (None, Some(Value::Str(name))) => StepTarget::Recipe(name.clone()),
            (None, Some(inline @ Value::Map(_))) => {
                StepTarget::InlineRecipe(Box::new(Recipe::parse(label, inline)?))
            }
            (Some(other), None) | (None, Some(other)) => {
                return Err(bad(format!(
                    "cab/recipe must be a name or inline mapping, got {}",
                    other.kind()
                )))
            }
            (None, None) => return Err(bad("step needs a cab or a recipe".to_string())),
        };

        let params = match map.get("params") {
            Some(Value::Map(params)) => params.clone(),
            Some(other) => {
                return Err(bad(format!("params must be a mapping, got {}", other.kind())))
            }
            None => IndexMap::new(),
        };

        let tags = match map.get("tags") {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::Str(tag)) => vec![tag.clone()],
            _ => Vec::new(),
        };

        let skip_if_outputs = match map.get("skip_if_outputs").and_then(Value::as_str) {
            Some("exist") => Some(SkipIfOutputs::Exist),
            Some("fresh") => Some(SkipIfOutputs::Fresh),
            Some(other) => {
                return Err(bad(format!(
                    "skip_if_outputs must be 'exist' or 'fresh', got '{other}'"
                )))
            }
            None => None,
        };

        let assign = match map.get("assign") {
            Some(Value::Map(assign)) => assign.clone(),
            _ => IndexMap::new(),
        };

        Ok(Step {
            label: label.to_string(),
            target,
            params,
            tags,
            skip: map.get("skip").cloned(),
            skip_if_outputs,
            assign,
            backend: map.get("backend").cloned(),
            info: map.get("info").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Whether the step carries a given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The referenced cab name, if this step targets one by name.
    pub fn cab_name(&self) -> Option<&str> {
        match &self.target {
            StepTarget::Cab(name) => Some(name),
            StepTarget::InlineCab(cab) => Some(&cab.name),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
