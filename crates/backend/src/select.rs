// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection
//!
//! Preferences merge through the option layers (`opts.backend` →
//! recipe → cab → step, later wins) into a [`BackendPrefs`]. The
//! `select` list is tried in order; the first available backend wins,
//! wrapped in a batch submitter when `batch` options are present.

use crate::{Backend, BackendError, BatchOptions, BatchWrapper, NativeBackend};
use convoy_config::{merge, Value};
use std::path::Path;
use std::sync::Arc;

/// Merged backend preferences.
#[derive(Debug, Clone, Default)]
pub struct BackendPrefs {
    /// Backend names in preference order; empty means native.
    pub select: Vec<String>,
    /// Batch submission options composing over the selected backend.
    pub batch: Option<BatchOptions>,
    /// Raw merged subtree, for adapter-specific settings.
    pub settings: Value,
}

impl BackendPrefs {
    /// Merge preference layers in increasing priority and parse the
    /// result. `None` layers are skipped.
    pub fn from_layers(layers: &[Option<&Value>]) -> Result<BackendPrefs, BackendError> {
        let mut merged = Value::empty_map();
        for layer in layers.iter().flatten() {
            merge(&mut merged, (*layer).clone()).map_err(|e| BackendError::Settings {
                message: e.to_string(),
            })?;
        }
        BackendPrefs::parse(&merged)
    }

    fn parse(tree: &Value) -> Result<BackendPrefs, BackendError> {
        let select = match tree.get("select") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Str(one)) => vec![one.clone()],
            Some(Value::List(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        BackendError::Settings {
                            message: format!("select entries must be strings, got {}", item.kind()),
                        }
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(BackendError::Settings {
                    message: format!("select must be a string or list, got {}", other.kind()),
                })
            }
        };
        let batch = match tree.get("batch") {
            None | Some(Value::Null) => None,
            Some(section) => {
                Some(section.into_typed().map_err(|e| BackendError::Settings {
                    message: format!("bad batch options: {e}"),
                })?)
            }
        };
        Ok(BackendPrefs {
            select,
            batch,
            settings: tree.clone(),
        })
    }
}

/// The set of known backends, probed in preference order.
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        BackendRegistry {
            backends: vec![Arc::new(NativeBackend::new())],
        }
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an external adapter (container runtime, cluster
    /// scheduler).
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.push(backend);
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Pick the first available backend from the preferences, composing
    /// the batch wrapper when requested.
    pub fn select(&self, prefs: &BackendPrefs) -> Result<Arc<dyn Backend>, BackendError> {
        let names: Vec<String> = if prefs.select.is_empty() {
            vec!["native".to_string()]
        } else {
            prefs.select.clone()
        };

        let mut chosen = None;
        for name in &names {
            if let Some(backend) = self.find(name) {
                if backend.available() {
                    chosen = Some(Arc::clone(backend));
                    break;
                }
                tracing::debug!(backend = %name, "backend probe failed, trying next");
            }
        }
        let chosen = chosen.ok_or_else(|| BackendError::NoBackendAvailable {
            tried: names.clone(),
        })?;

        Ok(match &prefs.batch {
            Some(options) => Arc::new(BatchWrapper::new(options.clone(), chosen)),
            None => chosen,
        })
    }
}

/// Probe for an executable on `PATH`; the availability check used by
/// wrapper backends and external adapters.
pub fn executable_on_path(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }
    let Ok(path) = std::env::var("PATH") else {
        return false;
    };
    path.split(':')
        .filter(|dir| !dir.is_empty())
        .any(|dir| Path::new(dir).join(name).is_file())
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod tests;
