// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-file bookkeeping: existence and freshness checks, directory
//! creation, and pre-run removal.

use crate::RunError;
use convoy_config::Value;
use convoy_recipe::{Bindings, OutputFile};
use convoy_schema::SchemaSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn resolve(workdir: Option<&Path>, path: &str) -> PathBuf {
    let p = Path::new(path);
    match workdir {
        Some(base) if p.is_relative() => base.join(p),
        _ => p.to_path_buf(),
    }
}

/// `skip_if_outputs: exist` — every required file output already on
/// disk. No file outputs means no skipping.
pub fn outputs_exist(outputs: &[OutputFile], workdir: Option<&Path>) -> bool {
    if outputs.is_empty() {
        return false;
    }
    outputs
        .iter()
        .all(|output| resolve(workdir, &output.path).exists())
}

/// `skip_if_outputs: fresh` — outputs exist and the oldest output is at
/// least as new as the newest input (excluding `skip_freshness_checks`
/// entries). No file outputs means "do not skip".
pub fn outputs_fresh(
    outputs: &[OutputFile],
    inputs: &SchemaSet,
    params: &Bindings,
    workdir: Option<&Path>,
) -> bool {
    if outputs.is_empty() {
        return false;
    }

    let mut oldest_output: Option<SystemTime> = None;
    for output in outputs {
        let Ok(meta) = std::fs::metadata(resolve(workdir, &output.path)) else {
            return false;
        };
        let Ok(mtime) = meta.modified() else {
            return false;
        };
        oldest_output = Some(match oldest_output {
            Some(current) => current.min(mtime),
            None => mtime,
        });
    }
    let Some(oldest_output) = oldest_output else {
        return false;
    };

    let mut newest_input: Option<SystemTime> = None;
    for (name, schema) in inputs {
        if !schema.is_file_like() || schema.skip_freshness_checks {
            continue;
        }
        let Some(value) = params.get(name) else {
            continue;
        };
        for path in file_paths(value) {
            if let Ok(mtime) = std::fs::metadata(resolve(workdir, &path)).and_then(|m| m.modified())
            {
                newest_input = Some(match newest_input {
                    Some(current) => current.max(mtime),
                    None => mtime,
                });
            }
        }
    }

    match newest_input {
        Some(newest) => oldest_output >= newest,
        // No inputs to compare against: existence is freshness
        None => true,
    }
}

/// `must_exist` inputs have to be on disk before the step runs.
/// Returns the first violating (parameter, path) pair.
pub fn missing_must_exist(
    inputs: &SchemaSet,
    params: &Bindings,
    workdir: Option<&Path>,
) -> Option<(String, String)> {
    for (name, schema) in inputs {
        if !schema.must_exist || !schema.is_file_like() {
            continue;
        }
        let Some(value) = params.get(name) else {
            continue;
        };
        for path in file_paths(value) {
            if !resolve(workdir, &path).exists() {
                return Some((name.clone(), path));
            }
        }
    }
    None
}

/// Apply `mkdir` and `remove_if_exists` side effects for bound file
/// outputs before a step runs.
pub fn prepare_outputs(
    outputs: &SchemaSet,
    params: &Bindings,
    workdir: Option<&Path>,
) -> Result<(), RunError> {
    for (name, schema) in outputs {
        if !schema.is_file_like() {
            continue;
        }
        let Some(value) = params.get(name) else {
            continue;
        };
        for path in file_paths(value) {
            let full = resolve(workdir, &path);
            if schema.mkdir {
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            if schema.remove_if_exists && full.exists() {
                tracing::debug!(output = %name, path = %full.display(), "removing stale output");
                if full.is_dir() {
                    std::fs::remove_dir_all(&full)?;
                } else {
                    std::fs::remove_file(&full)?;
                }
            }
        }
    }
    Ok(())
}

/// Remove cleanup patterns at cab exit.
pub fn apply_cleanup(patterns: &[String], workdir: Option<&Path>) {
    for pattern in patterns {
        let full = resolve(workdir, pattern).display().to_string();
        let Ok(walker) = glob::glob(&full) else {
            continue;
        };
        for path in walker.filter_map(Result::ok) {
            tracing::debug!(path = %path.display(), "cleanup");
            let _ = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
        }
    }
}

/// The path strings inside a (possibly list-valued) file parameter.
fn file_paths(value: &Value) -> Vec<String> {
    match value {
        Value::Str(s) => vec![s.clone()],
        Value::List(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;
