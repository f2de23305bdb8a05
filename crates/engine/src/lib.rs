// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The pipeline engine
//!
//! Executes a recipe against a merged configuration tree: prevalidates,
//! iterates steps in order (honoring selection, tags, skip flags and
//! for-loop scatter), binds and validates parameters, dispatches cab
//! invocations to the selected backend, pumps child output through the
//! wrangler pipeline, and propagates outputs back up through aliases.

mod error;
mod info;
mod options;
mod outputs;
mod run_log;
mod runtime;
mod scheduler;
mod wrangle;

pub use error::RunError;
pub use info::step_info;
pub use options::{RunOptions, StepSelection};
pub use run_log::RunLog;
pub use runtime::{run_cab, CabOutcome, CabStatus};
pub use scheduler::{load_documents, Engine, RunOutcome, StepRecord, StepStatus};
pub use wrangle::{json_to_value, process_line, LineDisposition, WrangleState};

use async_trait::async_trait;
use convoy_recipe::{Bindings, Cab};
use convoy_schema::SchemaSet;

/// The embedded-scripting collaborator interface. The engine needs it
/// only for dynamic schemas: given the bound parameters, the collaborator
/// runs the cab's `dynamic_schema` callable and returns revised
/// inputs/outputs maps.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn dynamic_schema(
        &self,
        reference: &str,
        cab: &Cab,
        params: &Bindings,
    ) -> Result<(SchemaSet, SchemaSet), RunError>;
}
