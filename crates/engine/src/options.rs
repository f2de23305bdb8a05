// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run options and step selection

use convoy_config::Value;
use std::time::Duration;

/// Options merged from the `opts` subtree of the configuration tree.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory for per-run log files (`opts.log.dir`).
    pub log_dir: Option<String>,
    /// Log file name template (`opts.log.name`), substituted against
    /// the run's namespaces.
    pub log_name: Option<String>,
    /// Per-step timeout (`opts.timeout`, seconds).
    pub step_timeout: Option<Duration>,
    /// Soft max-open-files limit (`opts.rlimits.nofile`).
    pub nofile_limit: Option<u64>,
    /// Global backend preferences (`opts.backend`).
    pub backend: Option<Value>,
}

impl RunOptions {
    /// Parse the `opts` subtree; missing keys keep their defaults.
    pub fn parse(opts: Option<&Value>) -> RunOptions {
        let mut options = RunOptions::default();
        let Some(opts) = opts else {
            return options;
        };
        options.log_dir = opts
            .get_path("log.dir")
            .and_then(Value::as_str)
            .map(str::to_string);
        options.log_name = opts
            .get_path("log.name")
            .and_then(Value::as_str)
            .map(str::to_string);
        options.step_timeout = opts
            .get_path("timeout")
            .and_then(Value::as_int)
            .filter(|t| *t > 0)
            .map(|t| Duration::from_secs(t as u64));
        options.nofile_limit = opts
            .get_path("rlimits.nofile")
            .and_then(Value::as_int)
            .filter(|n| *n > 0)
            .map(|n| n as u64);
        options.backend = opts.get("backend").cloned();
        options
    }
}

/// Which steps of a recipe to run.
#[derive(Debug, Clone, Default)]
pub struct StepSelection {
    /// Explicit step labels or inclusive ranges (`start:end`), possibly
    /// dotted for sub-recipe steps. Non-empty selection forces matching
    /// steps on, ignoring `skip` and `never` tags.
    pub steps: Vec<String>,
    /// Run only steps carrying one of these tags (plus `always` steps).
    pub tags: Vec<String>,
    /// Skip steps carrying one of these tags.
    pub skip_tags: Vec<String>,
}

impl StepSelection {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.tags.is_empty() && self.skip_tags.is_empty()
    }

    /// Expand labels and `start:end` ranges against the ordered label
    /// list of the current recipe. Dotted entries select the sub-recipe
    /// step they start with.
    pub fn selected_labels(&self, ordered: &[String]) -> Vec<String> {
        let mut selected = Vec::new();
        for entry in &self.steps {
            let entry_head = entry.split('.').next().unwrap_or(entry);
            if let Some((start, end)) = entry_head.split_once(':') {
                let start_at = ordered.iter().position(|l| l == start);
                let end_at = ordered.iter().position(|l| l == end);
                if let (Some(a), Some(b)) = (start_at, end_at) {
                    let (a, b) = if a <= b { (a, b) } else { (b, a) };
                    for label in &ordered[a..=b] {
                        selected.push(label.clone());
                    }
                }
            } else {
                selected.push(entry_head.to_string());
            }
        }
        selected
    }

    /// The selection visible inside a sub-recipe step: dotted entries
    /// with a matching head, their heads stripped.
    pub fn for_substep(&self, label: &str) -> StepSelection {
        let prefix = format!("{label}.");
        StepSelection {
            steps: self
                .steps
                .iter()
                .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
                .collect(),
            tags: self.tags.clone(),
            skip_tags: self.skip_tags.clone(),
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
