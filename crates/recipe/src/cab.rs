// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cab model
//!
//! A cab is an atomic task: a command, a flavour describing how the
//! command is invoked, input/output schemas, argv policies, an optional
//! container image, and management rules (environment, output wranglers,
//! cleanup patterns).

use crate::{Policies, RecipeError, WranglerRule};
use convoy_config::Value;
use convoy_schema::{parse_schema_set, SchemaSet};
use indexmap::IndexMap;

/// How a cab's command is interpreted and launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabFlavour {
    /// `command` is an executable invoked with policy-built argv.
    Binary,
    /// `command` names a task run inside an external interpreter via a
    /// generated driver (`taskname(kw=value, ...)`).
    TaskRunner {
        interpreter: String,
        wrapper: Option<String>,
    },
    /// `command` is a `module.callable` reference imported and called
    /// with keyword arguments inside a spawned interpreter.
    Callable { interpreter: String },
    /// `command` is a snippet executed inside a spawned interpreter;
    /// inputs arrive as variables (or a dict), outputs are collected
    /// from variables.
    InlineCode {
        interpreter: String,
        input_vars: bool,
        output_vars: bool,
    },
}

const DEFAULT_INTERPRETER: &str = "python3";

impl CabFlavour {
    fn parse(name: &str, value: Option<&Value>) -> Result<CabFlavour, RecipeError> {
        let bad = |message: String| RecipeError::Definition {
            name: name.to_string(),
            message,
        };
        let Some(value) = value else {
            return Ok(CabFlavour::Binary);
        };
        match value {
            Value::Str(kind) => CabFlavour::from_kind(kind, None).ok_or_else(|| {
                bad(format!("unknown flavour '{kind}'"))
            }),
            Value::Map(map) => {
                let kind = map
                    .get("kind")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad("flavour mapping needs a 'kind'".to_string()))?;
                CabFlavour::from_kind(kind, Some(map))
                    .ok_or_else(|| bad(format!("unknown flavour '{kind}'")))
            }
            other => Err(bad(format!(
                "flavour must be a string or mapping, got {}",
                other.kind()
            ))),
        }
    }

    fn from_kind(kind: &str, map: Option<&IndexMap<String, Value>>) -> Option<CabFlavour> {
        let get_str = |key: &str| -> Option<String> {
            map.and_then(|m| m.get(key)).and_then(Value::as_str).map(str::to_string)
        };
        let get_bool =
            |key: &str, default: bool| map.and_then(|m| m.get(key)).and_then(Value::as_bool).unwrap_or(default);
        let interpreter =
            get_str("interpreter").unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
        match kind {
            "binary" => Some(CabFlavour::Binary),
            "task-runner" => Some(CabFlavour::TaskRunner {
                interpreter,
                wrapper: get_str("wrapper"),
            }),
            "callable" => Some(CabFlavour::Callable { interpreter }),
            "code" => Some(CabFlavour::InlineCode {
                interpreter,
                input_vars: get_bool("input_vars", true),
                output_vars: get_bool("output_vars", true),
            }),
            _ => None,
        }
    }
}

/// Container image reference: `registry/name:version` or a local path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub path: Option<String>,
}

impl ImageRef {
    fn parse(cab: &str, value: &Value) -> Result<ImageRef, RecipeError> {
        match value {
            Value::Str(text) => {
                let (rest, version) = match text.rsplit_once(':') {
                    Some((rest, v)) => (rest, Some(v.to_string())),
                    None => (text.as_str(), None),
                };
                let (registry, name) = match rest.rsplit_once('/') {
                    Some((reg, n)) => (Some(reg.to_string()), n.to_string()),
                    None => (None, rest.to_string()),
                };
                Ok(ImageRef {
                    registry,
                    name,
                    version,
                    path: None,
                })
            }
            Value::Map(map) => Ok(ImageRef {
                registry: map.get("registry").and_then(Value::as_str).map(str::to_string),
                name: map
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_default(),
                version: map.get("version").and_then(Value::as_str).map(str::to_string),
                path: map.get("path").and_then(Value::as_str).map(str::to_string),
            }),
            other => Err(RecipeError::Definition {
                name: cab.to_string(),
                message: format!("image must be a string or mapping, got {}", other.kind()),
            }),
        }
    }

    /// Canonical `registry/name:version` form.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        if let Some(registry) = &self.registry {
            out.push_str(registry);
            out.push('/');
        }
        out.push_str(&self.name);
        if let Some(version) = &self.version {
            out.push(':');
            out.push_str(version);
        }
        out
    }
}

/// Cab management: environment, output wranglers, exit cleanup.
#[derive(Debug, Clone, Default)]
pub struct Management {
    /// Extra environment variables; values undergo substitution at bind
    /// time.
    pub environment: IndexMap<String, String>,
    pub wranglers: Vec<WranglerRule>,
    /// Filename patterns removed at cab exit.
    pub cleanup: Vec<String>,
}

impl Management {
    fn parse(cab: &str, value: Option<&Value>) -> Result<Management, RecipeError> {
        let mut management = Management::default();
        let Some(value) = value else {
            return Ok(management);
        };
        let Some(map) = value.as_map() else {
            return Err(RecipeError::Definition {
                name: cab.to_string(),
                message: format!("management must be a mapping, got {}", value.kind()),
            });
        };
        if let Some(env) = map.get("environment").and_then(Value::as_map) {
            for (key, v) in env {
                management.environment.insert(key.clone(), v.to_string());
            }
        }
        if let Some(wranglers) = map.get("wranglers") {
            management.wranglers = WranglerRule::parse_section(wranglers)?;
        }
        if let Some(cleanup) = map.get("cleanup") {
            management.cleanup = match cleanup {
                Value::Str(s) => vec![s.clone()],
                Value::List(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
        }
        Ok(management)
    }
}

/// An atomic task definition.
#[derive(Debug, Clone)]
pub struct Cab {
    pub name: String,
    pub command: String,
    pub flavour: CabFlavour,
    pub image: Option<ImageRef>,
    pub policies: Policies,
    /// Backend preference subtree, merged by the dispatcher.
    pub backend: Option<Value>,
    pub inputs: SchemaSet,
    pub outputs: SchemaSet,
    pub management: Management,
    /// Reference to a collaborator callable that revises the schema
    /// after binding.
    pub dynamic_schema: Option<String>,
    pub info: Option<String>,
}

impl Cab {
    /// Parse a `cabs.<name>` entry.
    pub fn parse(name: &str, value: &Value) -> Result<Cab, RecipeError> {
        let bad = |message: String| RecipeError::Definition {
            name: name.to_string(),
            message,
        };
        let map = value
            .as_map()
            .ok_or_else(|| bad(format!("expected a mapping, got {}", value.kind())))?;

        let command = map
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| bad("missing 'command'".to_string()))?
            .to_string();

        let flavour = CabFlavour::parse(name, map.get("flavour"))?;
        let image = map
            .get("image")
            .map(|v| ImageRef::parse(name, v))
            .transpose()?;
        let policies = match map.get("policies") {
            Some(raw) => Policies::parse(raw)?,
            None => Policies::default(),
        };
        let inputs = match map.get("inputs") {
            Some(section) => parse_schema_set(section)?,
            None => SchemaSet::new(),
        };
        let outputs = match map.get("outputs") {
            Some(section) => parse_schema_set(section)?,
            None => SchemaSet::new(),
        };
        let management = Management::parse(name, map.get("management"))?;

        Ok(Cab {
            name: name.to_string(),
            command,
            flavour,
            image,
            policies,
            backend: map.get("backend").cloned(),
            inputs,
            outputs,
            management,
            dynamic_schema: map
                .get("dynamic_schema")
                .and_then(Value::as_str)
                .map(str::to_string),
            info: map.get("info").and_then(Value::as_str).map(str::to_string),
        })
    }
}

#[cfg(test)]
#[path = "cab_tests.rs"]
mod tests;
