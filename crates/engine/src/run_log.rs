// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run-log sink
//!
//! Shared by every concurrently running step, so writes must be
//! line-atomic: one lock per line. Each line also surfaces as a tracing
//! event, leaving formatting to whatever subscriber the embedding
//! application installs.

use convoy_recipe::Severity;
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
struct RunLogInner {
    file: Option<std::fs::File>,
    /// In-memory capture, for tests and for end-of-run error reports.
    capture: Option<Vec<(String, Severity, String)>>,
}

/// Line-atomic log sink shared across steps and scatter workers.
#[derive(Clone, Default)]
pub struct RunLog {
    inner: Arc<Mutex<RunLogInner>>,
}

impl RunLog {
    /// A sink that only forwards to tracing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that appends to a file.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(RunLog {
            inner: Arc::new(Mutex::new(RunLogInner {
                file: Some(file),
                capture: None,
            })),
        })
    }

    /// A sink that additionally captures lines in memory.
    pub fn with_capture() -> Self {
        RunLog {
            inner: Arc::new(Mutex::new(RunLogInner {
                file: None,
                capture: Some(Vec::new()),
            })),
        }
    }

    /// Emit one line attributed to a task.
    pub fn line(&self, fqname: &str, severity: Severity, text: &str) {
        let mut inner = self.inner.lock();
        if let Some(file) = &mut inner.file {
            let _ = writeln!(file, "{fqname}: {text}");
        }
        if let Some(capture) = &mut inner.capture {
            capture.push((fqname.to_string(), severity, text.to_string()));
        }
        drop(inner);
        match severity {
            Severity::Debug => tracing::debug!(target: "convoy::run", task = %fqname, "{}", text),
            Severity::Info => tracing::info!(target: "convoy::run", task = %fqname, "{}", text),
            Severity::Warning => {
                tracing::warn!(target: "convoy::run", task = %fqname, "{}", text)
            }
            Severity::Error => tracing::error!(target: "convoy::run", task = %fqname, "{}", text),
        }
    }

    /// Captured lines, when capture is enabled.
    pub fn captured(&self) -> Vec<(String, Severity, String)> {
        self.inner.lock().capture.clone().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "run_log_tests.rs"]
mod tests;
