// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document loading and include-reference resolution
//!
//! Include references come in several forms:
//!
//! ```text
//! common.yml              plain file, resolved through the search path
//! (cultcargo)wsclean.yml  file inside a registered package root
//! (.)local.yml            relative to the including document only
//! extras.yml [optional]   missing target is non-fatal
//! ```

use crate::{ConfigError, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable holding colon-separated include search paths.
pub const INCLUDE_PATH_VAR: &str = "CONVOY_INCLUDE";

/// A parsed include reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRef {
    /// Package name from a `(pkg)name` form.
    pub package: Option<String>,
    /// `(.)` prefix: resolve against the including document's directory only.
    pub local_only: bool,
    /// The file path part of the reference.
    pub path: String,
    /// Trailing `[optional]` marker.
    pub optional: bool,
}

impl IncludeRef {
    /// Parse a reference string into its parts.
    pub fn parse(reference: &str) -> Self {
        let mut rest = reference.trim();
        let mut optional = false;
        if let Some(stripped) = rest.strip_suffix("[optional]") {
            optional = true;
            rest = stripped.trim_end();
        }

        let mut package = None;
        let mut local_only = false;
        if let Some(stripped) = rest.strip_prefix("(.)") {
            local_only = true;
            rest = stripped;
        } else if let Some(close) = rest.strip_prefix('(').and_then(|r| r.split_once(')')) {
            package = Some(close.0.to_string());
            rest = close.1;
        }

        IncludeRef {
            package,
            local_only,
            path: rest.to_string(),
            optional,
        }
    }
}

/// Loads YAML documents and resolves include references through the
/// configured search path.
#[derive(Debug, Default)]
pub struct Loader {
    /// Registered package roots for `(pkg)name` references.
    packages: HashMap<String, PathBuf>,
    /// Extra search directories, tried after the current directory.
    extra_paths: Vec<PathBuf>,
}

impl Loader {
    /// Create a loader with the standard search path: the current
    /// directory, each entry of [`INCLUDE_PATH_VAR`], and the user
    /// configuration directory.
    pub fn new() -> Self {
        let mut extra_paths = Vec::new();
        if let Ok(paths) = std::env::var(INCLUDE_PATH_VAR) {
            extra_paths.extend(paths.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        if let Some(config) = dirs::config_dir() {
            extra_paths.push(config.join("convoy"));
        }
        Loader {
            packages: HashMap::new(),
            extra_paths,
        }
    }

    /// Register a package root for `(pkg)name` references.
    pub fn register_package(&mut self, name: impl Into<String>, root: impl Into<PathBuf>) {
        self.packages.insert(name.into(), root.into());
    }

    /// Add a search directory (tried after the current directory).
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.extra_paths.push(path.into());
    }

    /// Read and parse a single document. An empty document yields an
    /// empty mapping.
    pub fn load_file(&self, path: &Path) -> Result<Value, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Value::empty_map());
        }
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let tree = Value::from_yaml(yaml);
        if !tree.is_map() {
            return Err(ConfigError::Invalid {
                path: path.display().to_string(),
                message: format!("document root must be a mapping, not {}", tree.kind()),
            });
        }
        Ok(tree)
    }

    /// Resolve a reference to a concrete path.
    ///
    /// Returns `Ok(None)` when the reference is `[optional]` and the
    /// target does not exist anywhere on the search path.
    pub fn resolve(
        &self,
        reference: &IncludeRef,
        including_dir: Option<&Path>,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let found = self.search(reference, including_dir);
        match found {
            Some(path) => Ok(Some(path)),
            None if reference.optional => {
                tracing::debug!(reference = %reference.path, "optional include not found");
                Ok(None)
            }
            None => Err(ConfigError::IncludeNotFound {
                reference: reference.path.clone(),
            }),
        }
    }

    /// Resolve and load a referenced document together with its directory
    /// (needed to resolve that document's own includes).
    pub fn load_ref(
        &self,
        reference: &IncludeRef,
        including_dir: Option<&Path>,
    ) -> Result<Option<(Value, PathBuf)>, ConfigError> {
        match self.resolve(reference, including_dir)? {
            None => Ok(None),
            Some(path) => {
                let tree = self.load_file(&path)?;
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                tracing::debug!(path = %path.display(), "loaded include");
                Ok(Some((tree, dir)))
            }
        }
    }

    fn search(&self, reference: &IncludeRef, including_dir: Option<&Path>) -> Option<PathBuf> {
        if let Some(pkg) = &reference.package {
            let root = self.packages.get(pkg)?;
            let candidate = root.join(&reference.path);
            return candidate.is_file().then_some(candidate);
        }

        if reference.local_only {
            let candidate = including_dir?.join(&reference.path);
            return candidate.is_file().then_some(candidate);
        }

        // Absolute paths bypass the search path entirely.
        let as_path = Path::new(&reference.path);
        if as_path.is_absolute() {
            return as_path.is_file().then(|| as_path.to_path_buf());
        }

        let mut candidates: Vec<PathBuf> = vec![PathBuf::from(&reference.path)];
        candidates.extend(self.extra_paths.iter().map(|d| d.join(&reference.path)));
        if let Some(dir) = including_dir {
            candidates.push(dir.join(&reference.path));
        }
        candidates.into_iter().find(|c| c.is_file())
    }
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
