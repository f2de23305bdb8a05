// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-parameter argv synthesis policies
//!
//! Policies describe how one bound parameter becomes command-line
//! arguments: key prefix, key=value packing, positional placement, list
//! handling, boolean rendering, and value formatting. Cab-level policies
//! apply to every parameter; a schema's `policies:` block overrides
//! field-wise.

use crate::{Bindings, RecipeError};
use convoy_config::Value;
use convoy_schema::SchemaSet;
use indexmap::IndexMap;
use serde::Deserialize;

/// Argv synthesis policies. Every field is optional so that overrides
/// merge field-wise.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policies {
    /// Option key prefix (default `--`).
    pub prefix: Option<String>,
    /// Pack as a single `key=value` token.
    pub key_value: Option<bool>,
    /// Emit the value only, after all keyed options.
    pub positional: Option<bool>,
    /// Emit the value only, before all keyed options.
    pub positional_head: Option<bool>,
    /// List rendering: `list`, `[]`, `repeat`, or a separator string.
    pub repeat: Option<String>,
    /// Never emit this parameter.
    pub skip: Option<bool>,
    /// Never emit implicit parameters.
    pub skip_implicits: Option<bool>,
    /// Do not evaluate substitutions in this parameter's value.
    pub disable_substitutions: Option<bool>,
    /// Render `true` as this value instead of a bare flag.
    pub explicit_true: Option<String>,
    /// Render `false` as this value instead of omitting the option.
    pub explicit_false: Option<String>,
    /// Split a string value on this separator into a list first.
    pub split: Option<String>,
    /// Substring replacements applied to the option name.
    pub replace: Option<IndexMap<String, String>>,
    /// Format template applied to the value (elementwise for lists);
    /// `{value}` is the element, `{name}` any other bound parameter.
    pub format: Option<String>,
    /// Templates consuming list elements one-for-one.
    pub format_list: Option<Vec<String>>,
    /// Templates each receiving the scalar value plus all parameters.
    pub format_list_scalar: Option<Vec<String>>,
    /// Emit missing parameters as `None` instead of omitting them.
    pub pass_missing_as_none: Option<bool>,
}

impl Policies {
    /// Parse a `policies:` block kept raw on a schema or cab.
    pub fn parse(value: &Value) -> Result<Policies, RecipeError> {
        value.into_typed().map_err(|e| RecipeError::Definition {
            name: "policies".to_string(),
            message: e.to_string(),
        })
    }

    /// Field-wise merge: `over` wins wherever it is set.
    pub fn merged_with(&self, over: &Policies) -> Policies {
        macro_rules! pick {
            ($field:ident) => {
                over.$field.clone().or_else(|| self.$field.clone())
            };
        }
        Policies {
            prefix: pick!(prefix),
            key_value: pick!(key_value),
            positional: pick!(positional),
            positional_head: pick!(positional_head),
            repeat: pick!(repeat),
            skip: pick!(skip),
            skip_implicits: pick!(skip_implicits),
            disable_substitutions: pick!(disable_substitutions),
            explicit_true: pick!(explicit_true),
            explicit_false: pick!(explicit_false),
            split: pick!(split),
            replace: pick!(replace),
            format: pick!(format),
            format_list: pick!(format_list),
            format_list_scalar: pick!(format_list_scalar),
            pass_missing_as_none: pick!(pass_missing_as_none),
        }
    }
}

/// Where an argument lands in the final argv.
enum Placement {
    Head,
    Keyed,
    Tail,
}

/// Build the argv for a binary-flavoured cab: the command tokens, then
/// `positional_head` parameters, keyed options in schema-declaration
/// order, and `positional` parameters last.
pub fn build_argv(
    command: &str,
    inputs: &SchemaSet,
    outputs: &SchemaSet,
    cab_policies: &Policies,
    params: &Bindings,
) -> Result<Vec<String>, RecipeError> {
    let mut head = Vec::new();
    let mut keyed = Vec::new();
    let mut tail = Vec::new();

    for (name, schema) in inputs.iter().chain(outputs.iter()) {
        let policies = match &schema.policies {
            Some(raw) => cab_policies.merged_with(&Policies::parse(raw)?),
            None => cab_policies.clone(),
        };
        if policies.skip.unwrap_or(false) {
            continue;
        }
        if schema.implicit.is_some() && policies.skip_implicits.unwrap_or(false) {
            continue;
        }

        let value = match params.get(name) {
            Some(v) => v.clone(),
            None if policies.pass_missing_as_none.unwrap_or(false) => {
                Value::Str("None".to_string())
            }
            None => continue,
        };

        let placement = if policies.positional_head.unwrap_or(false) {
            Placement::Head
        } else if policies.positional.unwrap_or(false) {
            Placement::Tail
        } else {
            Placement::Keyed
        };

        let args = render_param(name, schema.nom_de_guerre.as_deref(), &value, &policies, params)?;
        match placement {
            Placement::Head => head.extend(args),
            Placement::Keyed => keyed.extend(args),
            Placement::Tail => tail.extend(args),
        }
    }

    let mut argv = split_command(command);
    argv.extend(head);
    argv.extend(keyed);
    argv.extend(tail);
    Ok(argv)
}

/// Split a command string into argv tokens, honoring single and double
/// quotes. Quotes group words; no other shell processing happens.
pub fn split_command(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    for c in command.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                other => {
                    current.push(other);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

fn render_param(
    name: &str,
    nom_de_guerre: Option<&str>,
    value: &Value,
    policies: &Policies,
    params: &Bindings,
) -> Result<Vec<String>, RecipeError> {
    let positional =
        policies.positional.unwrap_or(false) || policies.positional_head.unwrap_or(false);

    // Option name: nom_de_guerre, then replace mappings, then prefix.
    let mut key_name = nom_de_guerre.unwrap_or(name).to_string();
    if let Some(replacements) = &policies.replace {
        for (from, to) in replacements {
            key_name = key_name.replace(from.as_str(), to);
        }
    }
    let prefix = policies.prefix.as_deref().unwrap_or("--");
    let key = format!("{prefix}{key_name}");

    // Booleans render as flags unless explicit values are requested.
    if let Value::Bool(b) = value {
        let rendered = if *b {
            policies.explicit_true.clone()
        } else {
            policies.explicit_false.clone()
        };
        return Ok(match (rendered, *b, positional) {
            (Some(text), _, true) => vec![text],
            (Some(text), _, false) => vec![key, text],
            (None, true, true) => vec!["true".to_string()],
            (None, true, false) => vec![key],
            (None, false, _) => vec![],
        });
    }

    // Split policy turns a string into a list before rendering.
    let value = match (&policies.split, value) {
        (Some(sep), Value::Str(s)) if !sep.is_empty() => {
            Value::List(s.split(sep.as_str()).map(Value::from).collect())
        }
        _ => value.clone(),
    };

    let rendered = render_value(&value, policies, params)?;

    if positional {
        return Ok(rendered);
    }

    if policies.key_value.unwrap_or(false) {
        return Ok(vec![format!("{key}={}", rendered.join(","))]);
    }

    match &value {
        Value::List(_) => {
            let repeat = policies.repeat.as_deref().unwrap_or("list");
            Ok(match repeat {
                "list" => {
                    let mut args = vec![key];
                    args.extend(rendered);
                    args
                }
                "[]" => vec![key, format!("[{}]", rendered.join(","))],
                "repeat" => rendered
                    .into_iter()
                    .flat_map(|item| [key.clone(), item])
                    .collect(),
                separator => vec![key, rendered.join(separator)],
            })
        }
        _ => {
            let mut args = vec![key];
            args.extend(rendered);
            Ok(args)
        }
    }
}

/// Render a value into argv fragments, honoring the format policies.
fn render_value(
    value: &Value,
    policies: &Policies,
    params: &Bindings,
) -> Result<Vec<String>, RecipeError> {
    if let Some(templates) = &policies.format_list_scalar {
        // Each template receives the scalar plus all parameters.
        return templates
            .iter()
            .map(|t| expand_template(t, value, params))
            .collect();
    }

    match value {
        Value::List(items) => {
            if let Some(templates) = &policies.format_list {
                // Templates consume list elements one-for-one.
                return templates
                    .iter()
                    .zip(items)
                    .map(|(t, item)| expand_template(t, item, params))
                    .collect();
            }
            items
                .iter()
                .map(|item| match &policies.format {
                    Some(template) => expand_template(template, item, params),
                    None => Ok(item.to_string()),
                })
                .collect()
        }
        scalar => match &policies.format {
            Some(template) => Ok(vec![expand_template(template, scalar, params)?]),
            None => Ok(vec![scalar.to_string()]),
        },
    }
}

/// Expand `{value}` and `{param-name}` placeholders in a format template.
fn expand_template(
    template: &str,
    value: &Value,
    params: &Bindings,
) -> Result<String, RecipeError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            out.push('{');
            continue;
        }
        let mut name = String::new();
        for ch in chars.by_ref() {
            if ch == '}' {
                break;
            }
            name.push(ch);
        }
        if name == "value" {
            out.push_str(&value.to_string());
        } else if let Some(v) = params.get(&name) {
            out.push_str(&v.to_string());
        } else {
            return Err(RecipeError::Definition {
                name: "format".to_string(),
                message: format!("format template references unknown parameter '{name}'"),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "policies_tests.rs"]
mod tests;
