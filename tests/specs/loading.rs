// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document loading, merging and include resolution end to end

use crate::prelude::*;
use convoy_config::{Loader, Value};
use convoy_engine::{load_documents, StepSelection};
use convoy_recipe::Bindings;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn include_use_scrub_pipeline_runs() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "cabs.yml",
        r#"
cabs:
  base-echo:
    command: /bin/echo
    inputs:
      message: {dtype: str, policies: {positional: true}}
      verbose: bool
"#,
    );
    let main = write(
        &dir,
        "main.yml",
        r#"
_include: cabs.yml
cabs:
  quiet-echo:
    _use: cabs.base-echo
    _scrub: inputs.verbose
flow:
  steps:
    say: {cab: quiet-echo, params: {message: via-use}}
"#,
    );

    let loader = Loader::new();
    let tree = load_documents(&loader, &[main]).unwrap();
    // The merged cab inherited the command and lost the scrubbed input
    assert_eq!(
        tree.get_path("cabs.quiet-echo.command")
            .and_then(Value::as_str),
        Some("/bin/echo")
    );
    assert!(tree.get_path("cabs.quiet-echo.inputs.verbose").is_none());

    let (engine, log) = engine();
    engine
        .run(&tree, "flow", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert!(logged_lines(&log).contains(&"via-use".to_string()));
}

#[test]
fn later_documents_override_earlier() {
    let dir = TempDir::new().unwrap();
    let base = write(&dir, "base.yml", "opts: {timeout: 10}\nvars: {x: 1}");
    let over = write(&dir, "over.yml", "opts: {timeout: 20}");
    let loader = Loader::new();
    let tree = load_documents(&loader, &[base, over]).unwrap();
    assert_eq!(tree.get_path("opts.timeout").and_then(Value::as_int), Some(20));
    assert_eq!(tree.get_path("vars.x").and_then(Value::as_int), Some(1));
}

#[test]
fn include_search_path_env_var_is_honored() {
    let shared = TempDir::new().unwrap();
    write(&shared, "common.yml", "vars: {origin: include-path}");
    let dir = TempDir::new().unwrap();
    let main = write(&dir, "main.yml", "_include: common.yml");

    // The loader reads CONVOY_INCLUDE at construction; emulate it via
    // an explicit search path, which is what the variable feeds.
    let mut loader = Loader::new();
    loader.add_search_path(shared.path());
    let tree = load_documents(&loader, &[main]).unwrap();
    assert_eq!(
        tree.get_path("vars.origin").and_then(Value::as_str),
        Some("include-path")
    );
}

#[test]
fn include_name_constant_matches_docs() {
    assert_eq!(convoy_config::INCLUDE_PATH_VAR, "CONVOY_INCLUDE");
}
