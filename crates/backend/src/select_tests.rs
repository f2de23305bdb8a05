// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ProcessHandle;
use async_trait::async_trait;
use convoy_recipe::{ImageRef, InvocationPlan};

fn tree(yaml: &str) -> Value {
    Value::from_yaml(serde_yaml::from_str(yaml).unwrap())
}

/// A probe-controlled fake adapter for selection tests.
struct FakeBackend {
    name: &'static str,
    up: bool,
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        self.name
    }
    fn available(&self) -> bool {
        self.up
    }
    fn prepare(&self, plan: InvocationPlan) -> Result<InvocationPlan, BackendError> {
        Ok(plan)
    }
    async fn spawn(&self, _plan: &InvocationPlan) -> Result<ProcessHandle, BackendError> {
        Err(BackendError::Unavailable {
            name: self.name.to_string(),
        })
    }
    async fn build(&self, _image: &ImageRef) -> Result<String, BackendError> {
        Err(BackendError::BuildUnsupported {
            name: self.name.to_string(),
        })
    }
}

#[test]
fn empty_prefs_pick_native() {
    let registry = BackendRegistry::new();
    let backend = registry.select(&BackendPrefs::default()).unwrap();
    assert_eq!(backend.name(), "native");
}

#[test]
fn first_available_wins() {
    let mut registry = BackendRegistry::new();
    registry.register(std::sync::Arc::new(FakeBackend {
        name: "cluster",
        up: false,
    }));
    registry.register(std::sync::Arc::new(FakeBackend {
        name: "container",
        up: true,
    }));

    let prefs = BackendPrefs::from_layers(&[Some(&tree(
        "{select: [cluster, container, native]}",
    ))])
    .unwrap();
    let backend = registry.select(&prefs).unwrap();
    assert_eq!(backend.name(), "container");
}

#[test]
fn unknown_and_unavailable_backends_fail_selection() {
    let mut registry = BackendRegistry::new();
    registry.register(std::sync::Arc::new(FakeBackend {
        name: "cluster",
        up: false,
    }));
    let prefs = BackendPrefs::from_layers(&[Some(&tree("{select: [cluster, nonesuch]}"))])
        .unwrap();
    assert!(matches!(
        registry.select(&prefs),
        Err(BackendError::NoBackendAvailable { .. })
    ));
}

#[test]
fn later_layers_override_earlier() {
    let opts = tree("{select: [native], batch: {command: srun}}");
    let step = tree("{select: [cluster]}");
    let prefs = BackendPrefs::from_layers(&[Some(&opts), None, Some(&step)]).unwrap();
    // step layer replaced select; batch from opts survives the merge
    assert_eq!(prefs.select, ["cluster"]);
    assert_eq!(prefs.batch.as_ref().unwrap().command, "srun");
}

#[test]
fn batch_options_compose_a_wrapper() {
    let registry = BackendRegistry::new();
    let prefs = BackendPrefs::from_layers(&[Some(&tree(
        "{select: native, batch: {command: env}}",
    ))])
    .unwrap();
    let backend = registry.select(&prefs).unwrap();
    assert_eq!(backend.name(), "batch");
}

#[test]
fn select_string_form_parses() {
    let prefs = BackendPrefs::from_layers(&[Some(&tree("{select: native}"))]).unwrap();
    assert_eq!(prefs.select, ["native"]);
}

#[test]
fn bad_select_type_is_rejected() {
    assert!(matches!(
        BackendPrefs::from_layers(&[Some(&tree("{select: 5}"))]),
        Err(BackendError::Settings { .. })
    ));
}

#[test]
fn executable_probe() {
    assert!(executable_on_path("sh"));
    assert!(executable_on_path("/bin/sh"));
    assert!(!executable_on_path("definitely-not-a-binary-xyzzy"));
}
