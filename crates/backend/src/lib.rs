// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Backend dispatch
//!
//! A backend turns an [`InvocationPlan`] into a running process. The
//! core ships the always-available native adapter (direct process
//! exec); container runtimes and cluster schedulers are external
//! collaborators implementing the same [`Backend`] trait. A batch
//! wrapper composes a scheduler submission command above any other
//! backend.

mod batch;
mod error;
mod handle;
mod native;
mod rlimit;
mod select;

pub use batch::{BatchOptions, BatchWrapper};
pub use error::BackendError;
pub use handle::ProcessHandle;
pub use native::NativeBackend;
pub use rlimit::apply_nofile_limit;
pub use select::{executable_on_path, BackendPrefs, BackendRegistry};

use async_trait::async_trait;
use convoy_recipe::{ImageRef, InvocationPlan};

/// An adapter that can launch invocation plans.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Registry name used in `backend.select` lists.
    fn name(&self) -> &str;

    /// Probe availability (executable present, client library usable).
    /// The native backend is always available.
    fn available(&self) -> bool;

    /// Rewrite a plan for this backend: inject wrapper commands, map
    /// mount paths, pre-stage files.
    fn prepare(&self, plan: InvocationPlan) -> Result<InvocationPlan, BackendError>;

    /// Launch a prepared plan.
    async fn spawn(&self, plan: &InvocationPlan) -> Result<ProcessHandle, BackendError>;

    /// Build (or fetch) the image a plan runs in; a no-op for the
    /// native backend.
    async fn build(&self, image: &ImageRef) -> Result<String, BackendError>;
}
