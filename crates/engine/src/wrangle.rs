// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wrangler pipeline
//!
//! Every output line runs against every wrangler rule in declaration
//! order; the actions of each matching rule run in listed order.
//! `SUPPRESS` affects display only — parsing actions still see the
//! line. Output precedence is `PARSE_JSON_OUTPUT_DICT` over
//! `PARSE_JSON_OUTPUTS` over `PARSE_OUTPUT`, later lines winning
//! within a tier.

use crate::RunError;
use convoy_config::Value;
use convoy_recipe::{Bindings, Severity, WranglerAction, WranglerRule};
use convoy_schema::{typecheck, Schema};

/// What the runtime should do with a line after wrangling.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDisposition {
    /// `None` when suppressed from display.
    pub display: Option<String>,
    pub severity: Severity,
    pub highlight: Option<String>,
}

/// Accumulated wrangler effects over a cab's whole output.
#[derive(Debug, Default)]
pub struct WrangleState {
    parse_outputs: Bindings,
    json_outputs: Bindings,
    json_dict: Bindings,
    pub warnings: Vec<String>,
    pub declared_error: Option<String>,
    pub declared_success: bool,
}

impl WrangleState {
    /// Merge captured outputs by precedence tier.
    pub fn outputs(&self) -> Bindings {
        let mut merged = self.parse_outputs.clone();
        for (k, v) in &self.json_outputs {
            merged.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.json_dict {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// Run one line through the rules, mutating `state` and returning the
/// line's disposition.
pub fn process_line(
    line: &str,
    rules: &[WranglerRule],
    state: &mut WrangleState,
) -> Result<LineDisposition, RunError> {
    let mut disposition = LineDisposition {
        display: Some(line.to_string()),
        severity: Severity::Info,
        highlight: None,
    };

    for rule in rules {
        let Some(captures) = rule.pattern.captures(line) else {
            continue;
        };
        for action in &rule.actions {
            match action {
                WranglerAction::ParseOutput { name, group, dtype } => {
                    if let Some(text) = captures.name(group).map(|m| m.as_str()) {
                        let schema = Schema::of(dtype.clone());
                        let value = typecheck(name, &Value::from(text), &schema)?;
                        state.parse_outputs.insert(name.clone(), value);
                    }
                }
                WranglerAction::ParseJsonOutputs => {
                    for group in rule.pattern.capture_names().flatten() {
                        if let Some(text) = captures.name(group).map(|m| m.as_str()) {
                            if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
                                state
                                    .json_outputs
                                    .insert(group.to_string(), json_to_value(json));
                            }
                        }
                    }
                }
                WranglerAction::ParseJsonOutputDict => {
                    let text = captures
                        .get(1)
                        .map(|m| m.as_str())
                        .unwrap_or_else(|| captures.get(0).map_or("", |m| m.as_str()));
                    if let Ok(serde_json::Value::Object(object)) =
                        serde_json::from_str::<serde_json::Value>(text)
                    {
                        for (key, json) in object {
                            state.json_dict.insert(key, json_to_value(json));
                        }
                    }
                }
                WranglerAction::Replace { text } => {
                    if disposition.display.is_some() {
                        disposition.display = Some(text.clone());
                    }
                }
                WranglerAction::Highlight { style } => {
                    disposition.highlight = Some(style.clone());
                }
                WranglerAction::Severity { level } => {
                    disposition.severity = *level;
                }
                WranglerAction::Suppress => {
                    disposition.display = None;
                }
                WranglerAction::Warning { message } => {
                    state.warnings.push(message.clone());
                }
                WranglerAction::DeclareError { message } => {
                    let message = message
                        .clone()
                        .unwrap_or_else(|| format!("error pattern matched: {line}"));
                    // First declared error wins the report
                    state.declared_error.get_or_insert(message);
                }
                WranglerAction::DeclareSuccess => {
                    state.declared_success = true;
                }
            }
        }
    }
    Ok(disposition)
}

/// Convert parsed JSON into a configuration value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(object) => {
            let mut map = indexmap::IndexMap::with_capacity(object.len());
            for (k, v) in object {
                map.insert(k, json_to_value(v));
            }
            Value::Map(map)
        }
    }
}

#[cfg(test)]
#[path = "wrangle_tests.rs"]
mod tests;
