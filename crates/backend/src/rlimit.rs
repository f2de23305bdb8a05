// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource limits for locally-spawned processes
//!
//! Limits are applied to the current process before spawning; children
//! inherit them across exec. The soft limit is raised or lowered, the
//! hard limit is never exceeded.

use crate::BackendError;
use nix::sys::resource::{getrlimit, setrlimit, Resource};

/// Apply a soft max-open-files limit, clamped to the hard limit.
pub fn apply_nofile_limit(limit: u64) -> Result<(), BackendError> {
    let (_soft, hard) =
        getrlimit(Resource::RLIMIT_NOFILE).map_err(|e| BackendError::ResourceLimit {
            message: format!("getrlimit: {e}"),
        })?;
    let clamped = limit.min(hard);
    tracing::debug!(requested = limit, applied = clamped, "setting RLIMIT_NOFILE");
    setrlimit(Resource::RLIMIT_NOFILE, clamped, hard).map_err(|e| {
        BackendError::ResourceLimit {
            message: format!("setrlimit: {e}"),
        }
    })
}
