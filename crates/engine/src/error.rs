// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for recipe execution

use thiserror::Error;

/// Errors that can occur while running a recipe
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] convoy_config::ConfigError),

    #[error(transparent)]
    Recipe(#[from] convoy_recipe::RecipeError),

    #[error(transparent)]
    Schema(#[from] convoy_schema::SchemaError),

    #[error(transparent)]
    Subst(#[from] convoy_subst::SubstError),

    #[error(transparent)]
    Backend(#[from] convoy_backend::BackendError),

    #[error("recipe not found: {name}")]
    RecipeNotFound { name: String },

    #[error("cab not found: {name}")]
    CabNotFound { name: String },

    #[error("step '{step}': required output '{output}' was not produced")]
    MissingRequiredOutput { step: String, output: String },

    #[error("step '{step}': input '{param}' names '{path}', which does not exist")]
    MissingInput {
        step: String,
        param: String,
        path: String,
    },

    #[error("step '{step}' timed out")]
    Timeout { step: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("step '{step}' failed: {message}")]
    CabFailure {
        step: String,
        message: String,
        stderr_tail: Vec<String>,
    },

    #[error("cab '{cab}' declares a dynamic schema but no script host is registered")]
    DynamicSchemaUnsupported { cab: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}
