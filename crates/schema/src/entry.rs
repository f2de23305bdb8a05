// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema declarations
//!
//! Longhand form is a mapping of attributes:
//!
//! ```yaml
//! ms:
//!   dtype: MS
//!   required: true
//!   info: "the measurement set to image"
//! ```
//!
//! Shorthand packs the common attributes into one string:
//!
//! ```yaml
//! ms: "MS * 'the measurement set to image'"
//! column: "str = DATA"
//! ```
//!
//! A subsection with no `dtype` and no known leaf attributes is a group;
//! its members flatten into dot-addressed names (`group.member`).

use crate::{DType, SchemaError};
use convoy_config::Value;
use indexmap::IndexMap;

/// Declared or derived parameter category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Required,
    Optional,
    Implicit,
    Obscure,
    Hidden,
}

impl Category {
    fn parse(text: &str) -> Option<Category> {
        match text.to_ascii_lowercase().as_str() {
            "required" => Some(Category::Required),
            "optional" => Some(Category::Optional),
            "implicit" => Some(Category::Implicit),
            "obscure" => Some(Category::Obscure),
            "hidden" => Some(Category::Hidden),
            _ => None,
        }
    }
}

/// One parameter declaration.
#[derive(Debug, Clone)]
pub struct Schema {
    pub dtype: DType,
    pub info: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
    /// Template producing the value at bind time; implicit outputs are
    /// not user-settable.
    pub implicit: Option<String>,
    pub choices: Vec<Value>,
    pub element_choices: Vec<Value>,
    pub must_exist: bool,
    pub writable: bool,
    pub mkdir: bool,
    pub remove_if_exists: bool,
    pub access_parent_dir: bool,
    pub skip_freshness_checks: bool,
    /// Name under which the parameter is passed to the underlying tool.
    pub nom_de_guerre: Option<String>,
    /// Per-parameter argv policy overrides, parsed by the cab model.
    pub policies: Option<Value>,
    /// Alias targets (`step.param`, `*.param`, `(cab).param`).
    pub aliases: Vec<String>,
    category: Option<Category>,
}

impl Schema {
    /// A plain optional schema of the given dtype.
    pub fn of(dtype: DType) -> Self {
        Schema {
            dtype,
            info: None,
            default: None,
            required: false,
            implicit: None,
            choices: Vec::new(),
            element_choices: Vec::new(),
            must_exist: false,
            writable: false,
            mkdir: false,
            remove_if_exists: false,
            access_parent_dir: false,
            skip_freshness_checks: false,
            nom_de_guerre: None,
            policies: None,
            aliases: Vec::new(),
            category: None,
        }
    }

    pub fn is_file_like(&self) -> bool {
        self.dtype.is_file_like()
    }

    /// The declared category, or the auto-classification: implicit
    /// entries are `Implicit`, required ones `Required`, the rest
    /// `Optional`.
    pub fn effective_category(&self) -> Category {
        if let Some(category) = self.category {
            return category;
        }
        if self.implicit.is_some() {
            Category::Implicit
        } else if self.required {
            Category::Required
        } else {
            Category::Optional
        }
    }

    /// Parse a single declaration (longhand mapping or shorthand string).
    pub fn parse(name: &str, value: &Value) -> Result<Schema, SchemaError> {
        let schema = match value {
            Value::Str(shorthand) => parse_shorthand(name, shorthand)?,
            Value::Map(map) => parse_longhand(name, map)?,
            Value::Null => Schema::of(DType::Str),
            other => {
                return Err(SchemaError::Invalid {
                    name: name.to_string(),
                    message: format!("expected a mapping or string, got {}", other.kind()),
                })
            }
        };
        schema.check_invariants(name)?;
        Ok(schema)
    }

    /// A parameter is at most one of {defaulted, required, implicit}.
    fn check_invariants(&self, name: &str) -> Result<(), SchemaError> {
        let conflict = |first, second| SchemaError::ConflictingAttributes {
            name: name.to_string(),
            first,
            second,
        };
        if self.required && self.default.is_some() {
            return Err(conflict("required", "default"));
        }
        if self.implicit.is_some() && self.default.is_some() {
            return Err(conflict("implicit", "default"));
        }
        if self.implicit.is_some() && self.required {
            return Err(conflict("implicit", "required"));
        }
        Ok(())
    }
}

/// Attribute names recognized in longhand declarations. A subsection
/// containing none of these (and no `dtype`) is a nested group.
const SCHEMA_ATTRS: &[&str] = &[
    "dtype",
    "info",
    "default",
    "required",
    "implicit",
    "choices",
    "element_choices",
    "must_exist",
    "writable",
    "mkdir",
    "remove_if_exists",
    "access_parent_dir",
    "skip_freshness_checks",
    "nom_de_guerre",
    "policies",
    "aliases",
    "category",
];

/// An ordered set of named schemas (flattened; group members carry
/// dotted names).
pub type SchemaSet = IndexMap<String, Schema>;

/// Parse an `inputs:` / `outputs:` section into a flat schema set.
pub fn parse_schema_set(section: &Value) -> Result<SchemaSet, SchemaError> {
    let mut out = SchemaSet::new();
    if section.is_null() {
        return Ok(out);
    }
    let Some(map) = section.as_map() else {
        return Err(SchemaError::Invalid {
            name: "inputs/outputs".to_string(),
            message: format!("expected a mapping, got {}", section.kind()),
        });
    };
    for (name, value) in map {
        flatten_entry(name, value, &mut out)?;
    }
    Ok(out)
}

fn flatten_entry(name: &str, value: &Value, out: &mut SchemaSet) -> Result<(), SchemaError> {
    if is_group(value) {
        if let Some(map) = value.as_map() {
            for (child, child_value) in map {
                flatten_entry(&format!("{name}.{child}"), child_value, out)?;
            }
        }
        return Ok(());
    }
    out.insert(name.to_string(), Schema::parse(name, value)?);
    Ok(())
}

fn is_group(value: &Value) -> bool {
    match value.as_map() {
        Some(map) => !map.is_empty() && !map.keys().any(|k| SCHEMA_ATTRS.contains(&k.as_str())),
        None => false,
    }
}

fn parse_longhand(
    name: &str,
    map: &IndexMap<String, Value>,
) -> Result<Schema, SchemaError> {
    let invalid = |message: String| SchemaError::Invalid {
        name: name.to_string(),
        message,
    };

    let dtype = match map.get("dtype") {
        Some(Value::Str(text)) => DType::parse(text)?,
        Some(other) => return Err(invalid(format!("dtype must be a string, got {}", other.kind()))),
        None => DType::Str,
    };
    let mut schema = Schema::of(dtype);

    for (key, value) in map {
        match key.as_str() {
            "dtype" => {}
            "info" => schema.info = value.as_str().map(str::to_string),
            "default" => schema.default = Some(value.clone()),
            "required" => schema.required = bool_attr(name, key, value)?,
            "implicit" => {
                schema.implicit = Some(match value {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                })
            }
            "choices" => schema.choices = list_attr(name, key, value)?,
            "element_choices" => schema.element_choices = list_attr(name, key, value)?,
            "must_exist" => schema.must_exist = bool_attr(name, key, value)?,
            "writable" => schema.writable = bool_attr(name, key, value)?,
            "mkdir" => schema.mkdir = bool_attr(name, key, value)?,
            "remove_if_exists" => schema.remove_if_exists = bool_attr(name, key, value)?,
            "access_parent_dir" => schema.access_parent_dir = bool_attr(name, key, value)?,
            "skip_freshness_checks" => {
                schema.skip_freshness_checks = bool_attr(name, key, value)?
            }
            "nom_de_guerre" => schema.nom_de_guerre = value.as_str().map(str::to_string),
            "policies" => schema.policies = Some(value.clone()),
            "aliases" => {
                schema.aliases = list_attr(name, key, value)?
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            }
            "category" => {
                let text = value.as_str().unwrap_or_default();
                schema.category = Some(Category::parse(text).ok_or_else(|| {
                    invalid(format!("unknown category '{text}'"))
                })?);
            }
            other => {
                return Err(invalid(format!("unknown schema attribute '{other}'")));
            }
        }
    }
    Ok(schema)
}

fn bool_attr(name: &str, key: &str, value: &Value) -> Result<bool, SchemaError> {
    value.as_bool().ok_or_else(|| SchemaError::Invalid {
        name: name.to_string(),
        message: format!("{key} must be a boolean, got {}", value.kind()),
    })
}

fn list_attr(name: &str, key: &str, value: &Value) -> Result<Vec<Value>, SchemaError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(SchemaError::Invalid {
            name: name.to_string(),
            message: format!("{key} must be a list, got {}", other.kind()),
        }),
    }
}

/// Shorthand grammar: `dtype [= default] [* "info"]`.
fn parse_shorthand(name: &str, text: &str) -> Result<Schema, SchemaError> {
    // The '*' separates the declaration from the info string.
    let (decl, info) = match text.split_once('*') {
        Some((decl, info_part)) => {
            let info_text = info_part
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .to_string();
            (decl.trim(), Some(info_text))
        }
        None => (text.trim(), None),
    };

    // Optional '= default'
    let mut default = None;
    let dtype_text = match decl.split_once('=') {
        Some((dtype_part, default_part)) => {
            let default_text = default_part.trim();
            let parsed: serde_yaml::Value =
                serde_yaml::from_str(default_text).map_err(|e| SchemaError::Invalid {
                    name: name.to_string(),
                    message: format!("bad default '{default_text}': {e}"),
                })?;
            default = Some(Value::from_yaml(parsed));
            dtype_part.trim()
        }
        None => decl,
    };

    let mut schema = Schema::of(DType::parse(dtype_text)?);
    schema.info = info.filter(|i| !i.is_empty());
    schema.default = default;
    Ok(schema)
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
