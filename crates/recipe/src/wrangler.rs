// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output wrangler rules
//!
//! `management.wranglers` is an ordered map of regex → action list.
//! Every rule is attempted against every output line, in declaration
//! order; the actions of each matching rule run in listed order.

use crate::RecipeError;
use convoy_config::Value;
use convoy_schema::DType;
use regex::Regex;

/// Log severity a wrangler can force on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn parse(text: &str) -> Option<Severity> {
        match text.to_ascii_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warning" | "warn" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

/// One action applied to a matching line.
#[derive(Debug, Clone, PartialEq)]
pub enum WranglerAction {
    /// Coerce a named capture group to a dtype and assign it to an
    /// output (`PARSE_OUTPUT[:name]:group:dtype`).
    ParseOutput {
        name: String,
        group: String,
        dtype: DType,
    },
    /// Parse each named capture group as JSON; assign to like-named
    /// outputs.
    ParseJsonOutputs,
    /// Parse the first capture group as a JSON object; assign its keys
    /// to like-named outputs.
    ParseJsonOutputDict,
    /// Replace the displayed line.
    Replace { text: String },
    /// Annotate the displayed line with a style.
    Highlight { style: String },
    /// Re-emit the line at this severity.
    Severity { level: Severity },
    /// Drop the line from display.
    Suppress,
    /// Append to the end-of-cab warning list.
    Warning { message: String },
    /// Mark the run failed regardless of exit code.
    DeclareError { message: Option<String> },
    /// Mark the run successful regardless of exit code.
    DeclareSuccess,
}

/// A compiled wrangler rule.
#[derive(Debug, Clone)]
pub struct WranglerRule {
    pub pattern: Regex,
    pub actions: Vec<WranglerAction>,
}

impl WranglerRule {
    /// Parse the `wranglers:` section: an ordered map of regex →
    /// action-string or list of action-strings.
    pub fn parse_section(section: &Value) -> Result<Vec<WranglerRule>, RecipeError> {
        let mut rules = Vec::new();
        if section.is_null() {
            return Ok(rules);
        }
        let Some(map) = section.as_map() else {
            return Err(RecipeError::Definition {
                name: "wranglers".to_string(),
                message: format!("expected a mapping, got {}", section.kind()),
            });
        };
        for (pattern_text, actions_value) in map {
            let pattern =
                Regex::new(pattern_text).map_err(|e| RecipeError::BadWrangler {
                    pattern: pattern_text.clone(),
                    message: e.to_string(),
                })?;
            let action_texts: Vec<&str> = match actions_value {
                Value::Str(s) => vec![s.as_str()],
                Value::List(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| RecipeError::BadWrangler {
                            pattern: pattern_text.clone(),
                            message: format!("expected an action string, got {}", item.kind()),
                        })
                    })
                    .collect::<Result<_, _>>()?,
                other => {
                    return Err(RecipeError::BadWrangler {
                        pattern: pattern_text.clone(),
                        message: format!("expected a string or list, got {}", other.kind()),
                    })
                }
            };
            let actions = action_texts
                .into_iter()
                .map(|text| parse_action(pattern_text, text))
                .collect::<Result<_, _>>()?;
            rules.push(WranglerRule { pattern, actions });
        }
        Ok(rules)
    }
}

fn parse_action(pattern: &str, text: &str) -> Result<WranglerAction, RecipeError> {
    let bad = |message: String| RecipeError::BadWrangler {
        pattern: pattern.to_string(),
        message,
    };
    let (head, rest) = match text.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (text, None),
    };
    match head {
        "PARSE_OUTPUT" => {
            let rest = rest.ok_or_else(|| bad("PARSE_OUTPUT needs arguments".to_string()))?;
            let parts: Vec<&str> = rest.split(':').collect();
            let (name, group, dtype_text) = match parts.as_slice() {
                [group, dtype] => ((*group).to_string(), (*group).to_string(), *dtype),
                [name, group, dtype] => ((*name).to_string(), (*group).to_string(), *dtype),
                _ => {
                    return Err(bad(format!(
                        "PARSE_OUTPUT takes 2 or 3 arguments, got {}",
                        parts.len()
                    )))
                }
            };
            let dtype = DType::parse(dtype_text)
                .map_err(|e| bad(format!("bad dtype in PARSE_OUTPUT: {e}")))?;
            Ok(WranglerAction::ParseOutput { name, group, dtype })
        }
        "PARSE_JSON_OUTPUTS" => Ok(WranglerAction::ParseJsonOutputs),
        "PARSE_JSON_OUTPUT_DICT" => Ok(WranglerAction::ParseJsonOutputDict),
        "REPLACE" => Ok(WranglerAction::Replace {
            text: rest.unwrap_or_default().to_string(),
        }),
        "HIGHLIGHT" => Ok(WranglerAction::Highlight {
            style: rest.unwrap_or_default().to_string(),
        }),
        "SEVERITY" => {
            let level_text = rest.ok_or_else(|| bad("SEVERITY needs a level".to_string()))?;
            let level = Severity::parse(level_text)
                .ok_or_else(|| bad(format!("unknown severity '{level_text}'")))?;
            Ok(WranglerAction::Severity { level })
        }
        "SUPPRESS" => Ok(WranglerAction::Suppress),
        "WARNING" => {
            let message = rest.ok_or_else(|| bad("WARNING needs a message".to_string()))?;
            Ok(WranglerAction::Warning {
                message: message.to_string(),
            })
        }
        "ERROR" => Ok(WranglerAction::DeclareError {
            message: rest.map(str::to_string),
        }),
        "DECLARE_SUCCESS" => Ok(WranglerAction::DeclareSuccess),
        other => Err(bad(format!("unknown wrangler action '{other}'"))),
    }
}

#[cfg(test)]
#[path = "wrangler_tests.rs"]
mod tests;
