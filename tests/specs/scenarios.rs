// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The six end-to-end scenarios, with literal values

use crate::prelude::*;
use convoy_config::Value;
use convoy_engine::{RunError, StepSelection, StepStatus};
use convoy_recipe::Bindings;

// 1. Force success: cat on a missing file, declared successful by a
//    wrangler, with an accumulated warning.
#[tokio::test]
async fn force_success() {
    let tree = config(
        r#"
cabs:
  cat:
    command: /bin/cat
    inputs:
      file: {dtype: File, policies: {positional: true}}
    management:
      wranglers:
        'No such file': [DECLARE_SUCCESS, 'WARNING:deliberate']
demo:
  steps:
    read: {cab: cat, params: {file: missing-file}}
"#,
    );
    let (engine, _log) = engine();
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(outcome.steps[0].status, StepStatus::Succeeded);
    assert!(outcome.warnings.contains(&"deliberate".to_string()));
}

// 2. Force failure: exit code 0, but a wrangler ERROR fires.
#[tokio::test]
async fn force_failure_with_message() {
    let dir = tempfile::TempDir::new().unwrap();
    let words = dir.path().join("words.txt");
    std::fs::write(&words, "brown fox\n").unwrap();

    let tree = config(&format!(
        r#"
cabs:
  cat:
    command: /bin/cat
    inputs:
      file: {{dtype: File, policies: {{positional: true}}}}
    management:
      wranglers:
        'fox': ['ERROR:Nobody expected the fox!']
demo:
  steps:
    read: {{cab: cat, params: {{file: '{}'}}}}
"#,
        words.display()
    ));
    let (engine, _log) = engine();
    let error = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap_err();
    match error {
        RunError::CabFailure { message, .. } => {
            assert_eq!(message, "Nobody expected the fox!");
        }
        other => panic!("expected cab failure, got {other}"),
    }
}

// 3. Parse named captures, flow them into the next step via previous.
#[tokio::test]
async fn parse_named_captures() {
    let tree = config(
        r#"
cabs:
  speaker:
    command: '/bin/echo brown cow eats the 5 lazy dogs'
    outputs: {eater: str, num_dogs: int}
    management:
      wranglers:
        'brown (?P<eater>\w+) eats the (?P<num_dogs>\d+) lazy dogs': ['PARSE_OUTPUT:eater:str', 'PARSE_OUTPUT:num_dogs:integer']
  teller:
    command: /bin/echo
    inputs:
      line: {dtype: str, policies: {positional: true}}
demo:
  steps:
    observe: {cab: speaker}
    tell:
      cab: teller
      params:
        line: "The bloody {current.who} ate {current.num} dogs!"
        who: "=previous.eater"
        num: "=previous.num_dogs"
"#,
    );
    let (engine, log) = engine();
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(
        outcome.steps[0].outputs.get("eater"),
        Some(&Value::from("cow"))
    );
    assert_eq!(outcome.steps[0].outputs.get("num_dogs"), Some(&Value::Int(5)));
    assert!(logged_lines(&log).contains(&"The bloody cow ate 5 dogs!".to_string()));
}

// 4. Alias propagation: down to both targets when supplied, up from a
//    target default when omitted.
#[tokio::test]
async fn alias_propagation_both_ways() {
    let tree = config(
        r#"
cabs:
  s1cab:
    command: /bin/echo
    inputs:
      ms: {dtype: str, default: bar.ms, policies: {positional: true}}
  s2cab:
    command: /bin/echo
    inputs:
      ms: {dtype: str, policies: {positional: true}}
demo:
  inputs: {ms: str}
  aliases: {ms: [s1.ms, s2.ms]}
  steps:
    s1: {cab: s1cab}
    s2: {cab: s2cab}
"#,
    );

    // Supplied: both steps receive it
    let (engine, _log) = engine();
    let outcome = engine
        .run(
            &tree,
            "demo",
            bindings("{ms: foo.ms}"),
            &StepSelection::default(),
        )
        .await
        .unwrap();
    for record in &outcome.steps {
        assert_eq!(record.params.get("ms"), Some(&Value::from("foo.ms")));
    }

    // Omitted: s1's default propagates up and over to s2
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(
        outcome.steps[1].params.get("ms"),
        Some(&Value::from("bar.ms"))
    );
}

// 5. Scatter loop: three concurrent iterations with formatted prefixes.
#[tokio::test]
async fn scatter_loop_formats_prefixes() {
    let tree = config(
        r#"
cabs:
  echo:
    command: /bin/echo
    inputs:
      message: {dtype: str, policies: {positional: true}}
demo:
  for_loop: {var: loop, over: [1, 2, 3], scatter: -1}
  assign: {image-prefix: 'out/im-s{recipe.loop:02d}'}
  steps:
    say: {cab: echo, params: {message: '{recipe.image-prefix}'}}
"#,
    );
    let (engine, log) = engine();
    let outcome = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(outcome.steps.len(), 3);
    assert!(outcome
        .steps
        .iter()
        .all(|r| r.status == StepStatus::Succeeded));
    let lines = logged_lines(&log);
    for prefix in ["out/im-s01", "out/im-s02", "out/im-s03"] {
        assert!(lines.contains(&prefix.to_string()), "missing {prefix}");
    }
}

// 6. Freshness skip: second run skipped, touched input runs again.
#[tokio::test]
async fn freshness_skip() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = dir.path().join("source.dat");
    let output = dir.path().join("o.fits");
    std::fs::write(&source, "data").unwrap();

    let prefix = dir.path().join("o").display().to_string();
    let tree = config(&format!(
        r#"
cabs:
  copier:
    command: /bin/cp
    inputs:
      src: {{dtype: File, policies: {{positional: true}}}}
      prefix: {{dtype: str, policies: {{skip: true}}}}
    outputs:
      dst: {{dtype: File, implicit: '{{current.prefix}}.fits', policies: {{positional: true}}}}
demo:
  steps:
    copy:
      cab: copier
      skip_if_outputs: fresh
      params: {{src: '{src}', prefix: '{prefix}'}}
"#,
        src = source.display(),
    ));

    let (engine, _log) = engine();
    let first = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(first.steps[0].status, StepStatus::Succeeded);
    assert!(output.exists());

    let second = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(second.steps[0].status, StepStatus::Skipped);

    let handle = std::fs::File::options().write(true).open(&source).unwrap();
    handle
        .set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(60))
        .unwrap();
    let third = engine
        .run(&tree, "demo", Bindings::new(), &StepSelection::default())
        .await
        .unwrap();
    assert_eq!(third.steps[0].status, StepStatus::Succeeded);
}
