// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for configuration loading and merging

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading and assembling the configuration tree
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed document {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("include not found: {reference}")]
    IncludeNotFound { reference: String },

    #[error("merge conflict at {path}: cannot merge {incoming} into {existing}")]
    MergeConflict {
        path: String,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("_use target not found: {path}")]
    UseMissing { path: String },

    #[error("_use cycle detected at {path}")]
    UseCycle { path: String },

    #[error("_scrub path not found: {path}")]
    ScrubPathMissing { path: String },

    #[error("invalid value at {path}: {message}")]
    Invalid { path: String, message: String },
}
