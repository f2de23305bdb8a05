// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The namespace stack
//!
//! Evaluation happens against an ordered list of named scopes (`recipe`,
//! `root`, `current`, `previous`, `steps`, `info`, `config`, `self`).
//! Lookup selects the innermost scope matching the first path segment and
//! walks the remaining segments through its tree. Step-label segments may
//! carry `*`/`?` wildcards; on multiple matches the alphanumerically
//! largest key wins.

use convoy_config::Value;
use std::path::PathBuf;

/// One named scope over a value tree.
#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub tree: Value,
}

/// Ordered stack of scopes; inner scopes shadow outer ones.
#[derive(Debug, Clone, Default)]
pub struct NsStack {
    scopes: Vec<Scope>,
    /// Base directory for filesystem functions (`GLOB`, `EXISTS`).
    base_dir: Option<PathBuf>,
}

impl NsStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a scope; shadows any existing scope of the same name.
    pub fn push(&mut self, name: impl Into<String>, tree: Value) {
        self.scopes.push(Scope {
            name: name.into(),
            tree,
        });
    }

    /// Replace the innermost scope of this name, or push a new one.
    pub fn set(&mut self, name: &str, tree: Value) {
        match self.scopes.iter_mut().rev().find(|s| s.name == name) {
            Some(scope) => scope.tree = tree,
            None => self.push(name, tree),
        }
    }

    /// Innermost scope of a given name.
    pub fn scope(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.name == name)
            .map(|s| &s.tree)
    }

    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = Some(dir.into());
    }

    pub fn base_dir(&self) -> Option<&PathBuf> {
        self.base_dir.as_ref()
    }

    /// Resolve a dotted path against the stack. The first segment names a
    /// scope; the rest walk its tree. Returns `None` when the scope or any
    /// segment is missing.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let (scope_name, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let tree = self.scope(scope_name)?;
        match rest {
            None => Some(tree.clone()),
            Some(rest) => lookup_in_tree(tree, rest),
        }
    }
}

/// Walk a dotted path through a tree, honoring `[index]` suffixes and
/// `*`/`?` wildcards in mapping-key segments.
pub fn lookup_in_tree(tree: &Value, path: &str) -> Option<Value> {
    let mut node = tree;
    for raw_seg in path.split('.') {
        let (name, indexes) = split_indexes(raw_seg);
        if !name.is_empty() {
            node = match node {
                Value::Map(map) => {
                    if name.contains('*') || name.contains('?') {
                        let pattern = glob::Pattern::new(name).ok()?;
                        // Largest matching key wins.
                        let key = map
                            .keys()
                            .filter(|k| pattern.matches(k))
                            .max_by(|a, b| a.as_str().cmp(b.as_str()))?;
                        map.get(key)?
                    } else {
                        map.get(name)?
                    }
                }
                Value::List(list) => list.get(name.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        for index in indexes {
            node = index_node(node, &index)?;
        }
    }
    Some(node.clone())
}

/// Split a path segment like `files[0][1]` into (`files`, `[0, 1]`).
fn split_indexes(seg: &str) -> (&str, Vec<String>) {
    let Some(open) = seg.find('[') else {
        return (seg, Vec::new());
    };
    let (name, rest) = seg.split_at(open);
    let indexes = rest
        .split('[')
        .filter(|part| !part.is_empty())
        .map(|part| part.trim_end_matches(']').to_string())
        .collect();
    (name, indexes)
}

fn index_node<'a>(node: &'a Value, index: &str) -> Option<&'a Value> {
    match node {
        Value::List(list) => {
            let i: i64 = index.parse().ok()?;
            let len = list.len() as i64;
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                list.get(i as usize)
            } else {
                None
            }
        }
        Value::Map(map) => map.get(index),
        _ => None,
    }
}

#[cfg(test)]
#[path = "ns_tests.rs"]
mod tests;
