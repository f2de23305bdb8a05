// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Include, use and scrub directive resolution
//!
//! A document may carry four reserved keys anywhere in its tree:
//!
//! - `_include`: documents merged *under* the enclosing body (the body wins)
//! - `_include_post`: documents merged *over* the enclosing body
//! - `_use`: dotted paths of subtrees within the same tree, copy-merged
//!   under the enclosing body
//! - `_scrub`: dotted paths removed from the enclosing body
//!
//! [`resolve_includes`] drives all four to a fixed point; the result
//! contains none of the directive keys.

use crate::{merge, ConfigError, Loader, Value};
use std::path::{Path, PathBuf};

/// Keys recognized at the top level of a merged tree. Anything else is
/// reparented under `lib.recipes` by [`reparent_top_level`].
pub const TOP_LEVEL_KEYS: &[&str] = &["cabs", "opts", "lib", "vars", "run", "image"];

const INCLUDE_KEY: &str = "_include";
const INCLUDE_POST_KEY: &str = "_include_post";
const USE_KEY: &str = "_use";
const SCRUB_KEY: &str = "_scrub";

/// Resolve all directive keys in `tree`, loading referenced documents
/// through `loader`. `doc_dir` is the directory of the document that
/// produced `tree`, used for `(.)`-prefixed references.
pub fn resolve_includes(
    tree: &mut Value,
    loader: &Loader,
    doc_dir: &Path,
) -> Result<(), ConfigError> {
    let mut stack = Vec::new();
    resolve_node(tree, loader, doc_dir, &mut stack)?;
    expand_uses(tree)?;
    apply_scrubs(tree)?;
    Ok(())
}

/// Move unrecognized top-level keys under `lib.recipes.<key>`.
pub fn reparent_top_level(tree: &mut Value) {
    let mut moved = Vec::new();
    if let Some(map) = tree.as_map_mut() {
        let strays: Vec<String> = map
            .keys()
            .filter(|k| !TOP_LEVEL_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        for key in strays {
            if let Some(value) = map.shift_remove(&key) {
                moved.push((key, value));
            }
        }
    }
    for (key, value) in moved {
        tracing::debug!(key, "reparenting top-level key under lib.recipes");
        tree.set_path(&format!("lib.recipes.{}", key), value);
    }
}

// ---------------------------------------------------------------------------
// _include / _include_post
// ---------------------------------------------------------------------------

fn resolve_node(
    node: &mut Value,
    loader: &Loader,
    doc_dir: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<(), ConfigError> {
    if !node.is_map() {
        return Ok(());
    }

    let pre_refs = take_reference_list(node, INCLUDE_KEY)?;
    let post_refs = take_reference_list(node, INCLUDE_POST_KEY)?;

    if !pre_refs.is_empty() {
        let mut base = Value::empty_map();
        for reference in &pre_refs {
            if let Some(included) = load_resolved(loader, reference, doc_dir, stack)? {
                merge(&mut base, included)?;
            }
        }
        let body = std::mem::replace(node, base);
        merge(node, body)?;
    }

    if !post_refs.is_empty() {
        for reference in &post_refs {
            if let Some(included) = load_resolved(loader, reference, doc_dir, stack)? {
                merge(node, included)?;
            }
        }
    }

    // Merged-in content may itself carry directives deeper down.
    if let Some(map) = node.as_map_mut() {
        for child in map.values_mut() {
            resolve_node(child, loader, doc_dir, stack)?;
        }
    }
    Ok(())
}

/// Load one reference and recursively resolve the loaded document's own
/// includes against its directory. Returns `None` for a missing optional.
fn load_resolved(
    loader: &Loader,
    reference: &str,
    doc_dir: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<Option<Value>, ConfigError> {
    let parsed = crate::IncludeRef::parse(reference);
    let Some(path) = loader.resolve(&parsed, Some(doc_dir))? else {
        return Ok(None);
    };
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    if stack.contains(&canonical) {
        return Err(ConfigError::Invalid {
            path: path.display().to_string(),
            message: "circular _include".to_string(),
        });
    }
    let mut tree = loader.load_file(&path)?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    stack.push(canonical);
    let resolved = resolve_node(&mut tree, loader, &dir, stack);
    stack.pop();
    resolved?;
    Ok(Some(tree))
}

fn take_reference_list(node: &mut Value, key: &str) -> Result<Vec<String>, ConfigError> {
    let Some(map) = node.as_map_mut() else {
        return Ok(Vec::new());
    };
    match map.shift_remove(key) {
        None => Ok(Vec::new()),
        Some(Value::Str(s)) => Ok(vec![s]),
        Some(Value::List(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Str(s) => Ok(s),
                other => Err(ConfigError::Invalid {
                    path: key.to_string(),
                    message: format!("expected a reference string, got {}", other.kind()),
                }),
            })
            .collect(),
        Some(other) => Err(ConfigError::Invalid {
            path: key.to_string(),
            message: format!("expected a string or list, got {}", other.kind()),
        }),
    }
}

// ---------------------------------------------------------------------------
// _use
// ---------------------------------------------------------------------------

/// Expand every `_use` directive against a snapshot of the tree taken
/// before expansion, so each target resolves to its declared content.
fn expand_uses(root: &mut Value) -> Result<(), ConfigError> {
    let snapshot = root.clone();
    let mut chain = Vec::new();
    expand_uses_in(root, &snapshot, &mut chain)
}

fn expand_uses_in(
    node: &mut Value,
    snapshot: &Value,
    chain: &mut Vec<String>,
) -> Result<(), ConfigError> {
    if !node.is_map() {
        return Ok(());
    }

    let targets = take_reference_list(node, USE_KEY)?;
    if !targets.is_empty() {
        let mut base = Value::empty_map();
        for target in &targets {
            let resolved = resolve_use_target(snapshot, target, chain)?;
            merge(&mut base, resolved)?;
        }
        let body = std::mem::replace(node, base);
        merge(node, body)?;
    }

    if let Some(map) = node.as_map_mut() {
        for child in map.values_mut() {
            expand_uses_in(child, snapshot, chain)?;
        }
    }
    Ok(())
}

fn resolve_use_target(
    snapshot: &Value,
    target: &str,
    chain: &mut Vec<String>,
) -> Result<Value, ConfigError> {
    if chain.iter().any(|seen| seen == target) {
        return Err(ConfigError::UseCycle {
            path: target.to_string(),
        });
    }
    let mut subtree = snapshot
        .get_path(target)
        .cloned()
        .ok_or_else(|| ConfigError::UseMissing {
            path: target.to_string(),
        })?;
    chain.push(target.to_string());
    let result = expand_uses_in(&mut subtree, snapshot, chain);
    chain.pop();
    result?;
    Ok(subtree)
}

// ---------------------------------------------------------------------------
// _scrub
// ---------------------------------------------------------------------------

fn apply_scrubs(node: &mut Value) -> Result<(), ConfigError> {
    if !node.is_map() {
        return Ok(());
    }
    let paths = take_reference_list(node, SCRUB_KEY)?;
    for path in &paths {
        if node.remove_path(path).is_none() {
            return Err(ConfigError::ScrubPathMissing { path: path.clone() });
        }
    }
    if let Some(map) = node.as_map_mut() {
        for child in map.values_mut() {
            apply_scrubs(child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "include_tests.rs"]
mod tests;
