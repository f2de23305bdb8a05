// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting properties and boundary behaviors

use crate::prelude::*;
use convoy_config::Value;
use convoy_engine::{StepSelection, StepStatus};
use convoy_recipe::Bindings;
use convoy_subst::{evaluate_string, Evaluated, NsStack};

#[test]
fn substitution_is_a_pure_function_of_the_stack() {
    let mut ns = NsStack::new();
    ns.push(
        "recipe",
        Value::from_yaml(serde_yaml::from_str("{x: 3, y: [a, b]}").unwrap()),
    );
    for formula in ["=recipe.x * 2", "prefix-{recipe.x:03d}", "='b' in recipe.y"] {
        let first = evaluate_string(formula, &ns).unwrap();
        let second = evaluate_string(formula, &ns).unwrap();
        assert_eq!(first, second, "{formula} was not deterministic");
    }
}

#[test]
fn unset_sentinel_removes_binding_for_later_lookups() {
    let mut ns = NsStack::new();
    ns.push(
        "recipe",
        Value::from_yaml(serde_yaml::from_str("{x: 1}").unwrap()),
    );
    let result = evaluate_string("=UNSET", &ns).unwrap();
    assert!(matches!(result, Evaluated::Unset { name: None }));

    // A parameter map evaluated with an UNSET value loses the key
    let params = match Value::from_yaml(
        serde_yaml::from_str("{kept: 1, dropped: '=UNSET'}").unwrap(),
    ) {
        Value::Map(map) => map,
        _ => unreachable!(),
    };
    let evaluated = convoy_subst::evaluate_params(&params, &ns).unwrap();
    assert!(evaluated.contains_key("kept"));
    assert!(!evaluated.contains_key("dropped"));
}

// Wildcard alias: `*.ms` reaches every step exposing an `ms` parameter.
#[tokio::test]
async fn wildcard_alias_reaches_all_exposing_steps() {
    let tree = config(
        r#"
cabs:
  with-ms:
    command: /bin/echo
    inputs:
      ms: {dtype: str, policies: {positional: true}}
  without-ms:
    command: /bin/echo
    inputs:
      other: {dtype: str, default: x, policies: {positional: true}}
demo:
  inputs: {ms: str}
  aliases: {ms: ['*.ms']}
  steps:
    a: {cab: with-ms}
    b: {cab: without-ms}
    c: {cab: with-ms}
"#,
    );
    let (engine, _log) = engine();
    let outcome = engine
        .run(
            &tree,
            "demo",
            bindings("{ms: wide.ms}"),
            &StepSelection::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.steps[0].params.get("ms"), Some(&Value::from("wide.ms")));
    assert!(outcome.steps[1].params.get("ms").is_none());
    assert_eq!(outcome.steps[2].params.get("ms"), Some(&Value::from("wide.ms")));
}

// `previous` after a skipped step sees that step's defaults, not the
// step before it.
#[tokio::test]
async fn previous_after_skipped_step_sees_defaults() {
    let tree = config(
        r#"
cabs:
  producer:
    command: /bin/echo
    inputs:
      marker: {dtype: str, default: from-producer, policies: {positional: true}}
  ghost:
    command: /bin/echo
    inputs:
      marker: {dtype: str, default: from-ghost}
  reporter:
    command: /bin/echo
    inputs:
      line: {dtype: str, policies: {positional: true}}
demo:
  steps:
    first: {cab: producer}
    skipped: {cab: ghost, skip: true}
    report: {cab: reporter, params: {line: 'saw {previous.marker}'}}
"#,
    );
    let (engine, log) = engine();
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(outcome.steps[1].status, StepStatus::Skipped);
    assert!(logged_lines(&log).contains(&"saw from-ghost".to_string()));
}

// `skip_if_outputs: fresh` with no file-type outputs must not skip.
#[tokio::test]
async fn freshness_with_no_file_outputs_runs() {
    let tree = config(
        r#"
cabs:
  echo:
    command: /bin/echo
    inputs:
      message: {dtype: str, policies: {positional: true}}
demo:
  steps:
    say: {cab: echo, skip_if_outputs: fresh, params: {message: always-runs}}
"#,
    );
    let (engine, log) = engine();
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(outcome.steps[0].status, StepStatus::Succeeded);
    assert!(logged_lines(&log).contains(&"always-runs".to_string()));
}

// The multiset of outcomes is scatter-independent.
#[tokio::test]
async fn scatter_factor_does_not_change_outcomes() {
    for scatter in [0, 2, -1] {
        let tree = config(&format!(
            r#"
cabs:
  echo:
    command: /bin/echo
    inputs:
      message: {{dtype: str, policies: {{positional: true}}}}
demo:
  for_loop: {{var: n, over: [1, 2, 3, 4], scatter: {scatter}}}
  steps:
    say: {{cab: echo, params: {{message: 'n={{recipe.n}}'}}}}
"#
        ));
        let (engine, log) = engine();
        let outcome = engine
            .run(&tree, "demo", Bindings::new(), &StepSelection::default())
            .await
            .unwrap();
        assert_eq!(outcome.steps.len(), 4, "scatter={scatter}");
        assert!(outcome.steps.iter().all(|r| r.status == StepStatus::Succeeded));
        let mut lines = logged_lines(&log);
        lines.sort();
        for n in 1..=4 {
            assert!(
                lines.contains(&format!("n={n}")),
                "scatter={scatter} missing n={n}"
            );
        }
    }
}
