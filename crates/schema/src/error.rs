// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for schema parsing and validation

use thiserror::Error;

/// Errors that can occur while parsing schemas and checking values
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("ill-formed schema for '{name}': {message}")]
    Invalid { name: String, message: String },

    #[error("bad dtype '{text}': {message}")]
    BadDType { text: String, message: String },

    #[error("parameter '{name}': expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("parameter '{name}': '{value}' is not one of the allowed choices")]
    BadChoice { name: String, value: String },

    #[error("schema for '{name}' cannot combine {first} with {second}")]
    ConflictingAttributes {
        name: String,
        first: &'static str,
        second: &'static str,
    },
}
