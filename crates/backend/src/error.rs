// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for backend dispatch

use thiserror::Error;

/// Errors that can occur selecting backends and launching plans
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("backend '{name}' is not available")]
    Unavailable { name: String },

    #[error("no selected backend is available (tried: {})", tried.join(", "))]
    NoBackendAvailable { tried: Vec<String> },

    #[error("backend '{name}' cannot build images")]
    BuildUnsupported { name: String },

    #[error("bad backend settings: {message}")]
    Settings { message: String },

    #[error("failed to apply resource limit: {message}")]
    ResourceLimit { message: String },
}
