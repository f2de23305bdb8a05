// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Configuration tree: document loading, deep merging, and include resolution
//!
//! A pipeline run starts from one or more YAML documents which are parsed
//! into a [`Value`] tree, deep-merged, and then fixed up by
//! [`resolve_includes`] until no `_include` / `_include_post` / `_use` /
//! `_scrub` directive keys remain.

mod error;
mod include;
mod load;
mod merge;
mod value;

pub use error::ConfigError;
pub use include::{resolve_includes, reparent_top_level, TOP_LEVEL_KEYS};
pub use load::{IncludeRef, Loader, INCLUDE_PATH_VAR};
pub use merge::merge;
pub use value::Value;
