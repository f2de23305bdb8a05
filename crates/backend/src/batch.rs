// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch-scheduler wrapping
//!
//! Composes above any other backend: the wrapped plan's argv is
//! prefixed with a submission command (`srun`-style) derived from the
//! merged backend options. Signals delivered to the submission process
//! are the scheduler's to forward.

use crate::{executable_on_path, Backend, BackendError, ProcessHandle};
use async_trait::async_trait;
use convoy_recipe::{ImageRef, InvocationPlan};
use serde::Deserialize;
use std::sync::Arc;

/// Submission command settings from the `backend.batch` subtree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchOptions {
    /// The submission executable, e.g. `srun`.
    pub command: String,
    /// Fixed arguments placed before the wrapped argv.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A backend that submits the inner backend's plan through a batch
/// scheduler.
pub struct BatchWrapper {
    options: BatchOptions,
    inner: Arc<dyn Backend>,
}

impl BatchWrapper {
    pub fn new(options: BatchOptions, inner: Arc<dyn Backend>) -> Self {
        BatchWrapper { options, inner }
    }
}

#[async_trait]
impl Backend for BatchWrapper {
    fn name(&self) -> &str {
        "batch"
    }

    fn available(&self) -> bool {
        self.inner.available() && executable_on_path(&self.options.command)
    }

    fn prepare(&self, plan: InvocationPlan) -> Result<InvocationPlan, BackendError> {
        let mut plan = self.inner.prepare(plan)?;
        let mut argv = vec![self.options.command.clone()];
        argv.extend(self.options.args.iter().cloned());
        argv.extend(std::mem::take(&mut plan.argv));
        plan.argv = argv;
        Ok(plan)
    }

    async fn spawn(&self, plan: &InvocationPlan) -> Result<ProcessHandle, BackendError> {
        self.inner.spawn(plan).await
    }

    async fn build(&self, image: &ImageRef) -> Result<String, BackendError> {
        self.inner.build(image).await
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
