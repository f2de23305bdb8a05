// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation planning
//!
//! Turns a cab plus bound parameters into an [`InvocationPlan`]: the
//! final argv (for scripting flavours this embeds a generated driver),
//! environment, working directory, mounts and the output-file manifest.
//! The plan is what backends prepare and spawn.

use crate::{build_argv, Bindings, Cab, CabFlavour, ImageRef, RecipeError};
use convoy_config::Value;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Marker prefix under which scripting drivers print their result as a
/// JSON object; the cab runtime collects outputs from such lines.
pub const RESULT_MARKER: &str = "##CONVOY:RESULT## ";

/// A host path visible inside a sandboxed backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub guest: PathBuf,
    pub readonly: bool,
}

/// One entry of the output-file manifest.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub param: String,
    pub path: String,
    pub required: bool,
    pub dtype: convoy_schema::DType,
    pub skip_freshness_checks: bool,
}

/// A fully composed invocation, ready for a backend.
#[derive(Debug, Clone)]
pub struct InvocationPlan {
    /// Fully qualified task name (`recipe.step` etc.), used for logging.
    pub fqname: String,
    pub argv: Vec<String>,
    pub env: IndexMap<String, String>,
    pub workdir: Option<PathBuf>,
    pub mounts: Vec<Mount>,
    /// File-valued outputs expected on disk after the run.
    pub outputs: Vec<OutputFile>,
    pub image: Option<ImageRef>,
}

impl Cab {
    /// Compose the invocation plan for this cab with bound parameters.
    pub fn invocation_plan(
        &self,
        fqname: &str,
        params: &Bindings,
        workdir: Option<PathBuf>,
    ) -> Result<InvocationPlan, RecipeError> {
        let argv = match &self.flavour {
            CabFlavour::Binary => {
                build_argv(&self.command, &self.inputs, &self.outputs, &self.policies, params)?
            }
            CabFlavour::TaskRunner {
                interpreter,
                wrapper,
            } => {
                let driver = task_driver(&self.command, params)?;
                let mut argv: Vec<String> = Vec::new();
                if let Some(wrapper) = wrapper {
                    argv.extend(wrapper.split_whitespace().map(str::to_string));
                }
                argv.extend(interpreter.split_whitespace().map(str::to_string));
                argv.push("-c".to_string());
                argv.push(driver);
                argv
            }
            CabFlavour::Callable { interpreter } => {
                let driver = callable_driver(&self.name, &self.command, params)?;
                let mut argv: Vec<String> =
                    interpreter.split_whitespace().map(str::to_string).collect();
                argv.push("-c".to_string());
                argv.push(driver);
                argv
            }
            CabFlavour::InlineCode {
                interpreter,
                input_vars,
                output_vars,
            } => {
                let driver =
                    inline_driver(self, &self.command, params, *input_vars, *output_vars)?;
                let mut argv: Vec<String> =
                    interpreter.split_whitespace().map(str::to_string).collect();
                argv.push("-c".to_string());
                argv.push(driver);
                argv
            }
        };

        let outputs = self
            .outputs
            .iter()
            .filter(|(_, schema)| schema.is_file_like())
            .filter_map(|(name, schema)| {
                params.get(name).map(|value| OutputFile {
                    param: name.clone(),
                    path: value.to_string(),
                    required: schema.required || schema.implicit.is_some(),
                    dtype: schema.dtype.clone(),
                    skip_freshness_checks: schema.skip_freshness_checks,
                })
            })
            .collect();

        Ok(InvocationPlan {
            fqname: fqname.to_string(),
            argv,
            env: self.management.environment.clone(),
            workdir,
            mounts: Vec::new(),
            outputs,
            image: self.image.clone(),
        })
    }
}

/// Driver for task-runner cabs: call the named task with keyword
/// arguments rendered as interpreter literals.
fn task_driver(task: &str, params: &Bindings) -> Result<String, RecipeError> {
    let kwargs: Vec<String> = params
        .iter()
        .map(|(name, value)| Ok(format!("{}={}", kwarg_name(name), py_literal(value)?)))
        .collect::<Result<_, RecipeError>>()?;
    Ok(format!("{}({})", task, kwargs.join(", ")))
}

/// Driver for callable cabs: import `module.func`, call with keyword
/// arguments, print the result under [`RESULT_MARKER`].
fn callable_driver(cab: &str, command: &str, params: &Bindings) -> Result<String, RecipeError> {
    let (module, func) = command.rsplit_once('.').ok_or_else(|| {
        RecipeError::Definition {
            name: cab.to_string(),
            message: format!("callable command '{command}' must be 'module.function'"),
        }
    })?;
    let kwargs: Vec<String> = params
        .iter()
        .map(|(name, value)| Ok(format!("{}={}", kwarg_name(name), py_literal(value)?)))
        .collect::<Result<_, RecipeError>>()?;
    Ok(format!(
        "import json\n\
         from {module} import {func}\n\
         _result = {func}({kwargs})\n\
         print({marker:?} + json.dumps({{\"_result\": _result}}))\n",
        module = module,
        func = func,
        kwargs = kwargs.join(", "),
        marker = RESULT_MARKER,
    ))
}

/// Driver for inline-code cabs: a preamble binding inputs, the declared
/// code, and a postamble printing declared outputs under
/// [`RESULT_MARKER`].
fn inline_driver(
    cab: &Cab,
    code: &str,
    params: &Bindings,
    input_vars: bool,
    output_vars: bool,
) -> Result<String, RecipeError> {
    let mut driver = String::from("import json\n");
    if input_vars {
        for (name, value) in params {
            driver.push_str(&format!("{} = {}\n", kwarg_name(name), py_literal(value)?));
        }
    } else {
        driver.push_str(&format!("params = {}\n", py_literal(&bindings_value(params))?));
    }
    driver.push_str(code);
    driver.push('\n');
    if output_vars && !cab.outputs.is_empty() {
        let names: Vec<String> = cab
            .outputs
            .keys()
            .map(|name| format!("{:?}: {}", name, kwarg_name(name)))
            .collect();
        driver.push_str(&format!(
            "print({marker:?} + json.dumps({{{names}}}))\n",
            marker = RESULT_MARKER,
            names = names.join(", "),
        ));
    }
    Ok(driver)
}

fn bindings_value(params: &Bindings) -> Value {
    Value::Map(params.clone())
}

/// Dotted group names become underscored keyword arguments.
fn kwarg_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Render a value as an interpreter literal.
fn py_literal(value: &Value) -> Result<String, RecipeError> {
    Ok(match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => format!("{s:?}"),
        Value::List(items) => {
            let rendered: Vec<String> =
                items.iter().map(py_literal).collect::<Result<_, _>>()?;
            format!("[{}]", rendered.join(", "))
        }
        Value::Map(map) => {
            let rendered: Vec<String> = map
                .iter()
                .map(|(k, v)| Ok(format!("{k:?}: {}", py_literal(v)?)))
                .collect::<Result<_, RecipeError>>()?;
            format!("{{{}}}", rendered.join(", "))
        }
    })
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
