// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The native backend: direct process execution
//!
//! Always available. Execs the plan's argv with the plan's environment
//! and working directory; mounts are meaningless here and ignored.

use crate::{Backend, BackendError, ProcessHandle};
use async_trait::async_trait;
use convoy_recipe::{ImageRef, InvocationPlan};
use std::process::Stdio;
use tokio::process::Command;

/// Direct process execution on the host.
#[derive(Debug, Default)]
pub struct NativeBackend {
    /// Soft max-open-files limit applied before spawning (inherited by
    /// children).
    pub nofile_limit: Option<u64>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nofile_limit(limit: u64) -> Self {
        NativeBackend {
            nofile_limit: Some(limit),
        }
    }
}

#[async_trait]
impl Backend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn available(&self) -> bool {
        true
    }

    fn prepare(&self, plan: InvocationPlan) -> Result<InvocationPlan, BackendError> {
        Ok(plan)
    }

    async fn spawn(&self, plan: &InvocationPlan) -> Result<ProcessHandle, BackendError> {
        let Some((program, args)) = plan.argv.split_first() else {
            return Err(BackendError::Settings {
                message: "empty argv".to_string(),
            });
        };

        if let Some(limit) = self.nofile_limit {
            crate::apply_nofile_limit(limit)?;
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&plan.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(workdir) = &plan.workdir {
            command.current_dir(workdir);
        }

        tracing::debug!(task = %plan.fqname, program = %program, "spawning");
        let child = command.spawn().map_err(|source| BackendError::Spawn {
            command: plan.argv.join(" "),
            source,
        })?;
        Ok(ProcessHandle::new(child))
    }

    async fn build(&self, image: &ImageRef) -> Result<String, BackendError> {
        // Nothing to build for direct execution.
        Ok(image.canonical())
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
