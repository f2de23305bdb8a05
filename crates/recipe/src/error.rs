// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the cab and recipe models

use thiserror::Error;

/// Errors raised while parsing definitions and prevalidating recipes
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("bad definition of '{name}': {message}")]
    Definition { name: String, message: String },

    #[error(transparent)]
    Schema(#[from] convoy_schema::SchemaError),

    #[error(transparent)]
    Subst(#[from] convoy_subst::SubstError),

    #[error("unresolved alias '{alias}': {message}")]
    UnresolvedAlias { alias: String, message: String },

    #[error("assign_based_on '{key}': value '{value}' matches no case and no DEFAULT")]
    AssignBasedOnUnmatched { key: String, value: String },

    #[error("step '{step}': required parameter '{param}' cannot be resolved")]
    UnresolvedParameter { step: String, param: String },

    #[error("bad wrangler /{pattern}/: {message}")]
    BadWrangler { pattern: String, message: String },
}
