// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::RunLog;
use convoy_backend::NativeBackend;
use convoy_config::Value;
use convoy_recipe::{Bindings, Cab, Severity};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn cab(yaml: &str) -> Cab {
    Cab::parse("test-cab", &Value::from_yaml(serde_yaml::from_str(yaml).unwrap())).unwrap()
}

fn bindings(yaml: &str) -> Bindings {
    match Value::from_yaml(serde_yaml::from_str(yaml).unwrap()) {
        Value::Map(map) => map,
        _ => panic!("expected mapping"),
    }
}

async fn run(
    cab_def: &Cab,
    params: &Bindings,
    log: &RunLog,
    timeout: Option<Duration>,
) -> Result<CabOutcome, crate::RunError> {
    let plan = cab_def.invocation_plan("test.step", params, None).unwrap();
    run_cab(
        cab_def,
        plan,
        Arc::new(NativeBackend::new()),
        log,
        &CancellationToken::new(),
        timeout,
    )
    .await
}

#[tokio::test]
async fn successful_run_logs_stdout() {
    let cab = cab(
        "{command: /bin/echo, inputs: {message: {dtype: str, policies: {positional: true}}}}",
    );
    let log = RunLog::with_capture();
    let outcome = run(&cab, &bindings("{message: hello}"), &log, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, CabStatus::Succeeded);
    let lines: Vec<String> = log.captured().into_iter().map(|(_, _, l)| l).collect();
    assert!(lines.contains(&"hello".to_string()));
}

#[tokio::test]
async fn nonzero_exit_fails() {
    let cab = cab("{command: '/bin/sh -c \"exit 7\"'}");
    let log = RunLog::new();
    let outcome = run(&cab, &Bindings::new(), &log, None).await.unwrap();
    assert_eq!(
        outcome.status,
        CabStatus::Failed {
            message: "exit code 7".to_string()
        }
    );
}

#[tokio::test]
async fn declare_success_overrides_exit_code() {
    // Scenario: cat on a missing file, declared successful by wrangler
    let cab = cab(
        r#"
command: /bin/cat
inputs: {file: {dtype: File, policies: {positional: true}}}
management:
  wranglers:
    'No such file': [DECLARE_SUCCESS, 'WARNING:deliberate']
"#,
    );
    let log = RunLog::with_capture();
    let outcome = run(&cab, &bindings("{file: missing-file}"), &log, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, CabStatus::Succeeded);
    assert_eq!(outcome.warnings, ["deliberate"]);
}

#[tokio::test]
async fn wrangler_error_overrides_zero_exit() {
    // Scenario: the file reads fine but the wrangler declares failure
    let dir = tempfile::TempDir::new().unwrap();
    let words = dir.path().join("words.txt");
    std::fs::write(&words, "brown fox\n").unwrap();

    let cab = cab(&format!(
        r#"
command: /bin/cat
inputs: {{file: {{dtype: File, policies: {{positional: true}}}}}}
management:
  wranglers:
    'fox': ['ERROR:Nobody expected the fox!']
"#,
    ));
    let log = RunLog::new();
    let outcome = run(
        &cab,
        &bindings(&format!("{{file: {}}}", words.display())),
        &log,
        None,
    )
    .await
    .unwrap();
    assert_eq!(
        outcome.status,
        CabStatus::Failed {
            message: "Nobody expected the fox!".to_string()
        }
    );
}

#[tokio::test]
async fn parse_output_captures_flow_to_outcome() {
    let cab = cab(
        r#"
command: '/bin/echo brown cow eats the 5 lazy dogs'
outputs: {eater: str, num_dogs: int}
management:
  wranglers:
    'brown (?P<eater>\w+) eats the (?P<num_dogs>\d+) lazy dogs': ['PARSE_OUTPUT:eater:str', 'PARSE_OUTPUT:num_dogs:int']
"#,
    );
    let log = RunLog::new();
    let outcome = run(&cab, &Bindings::new(), &log, None).await.unwrap();
    assert_eq!(outcome.status, CabStatus::Succeeded);
    assert_eq!(outcome.outputs.get("eater"), Some(&Value::from("cow")));
    assert_eq!(outcome.outputs.get("num_dogs"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn stderr_is_logged_as_warning_and_tailed() {
    let cab = cab("{command: '/bin/sh -c \"echo oops >&2\"'}");
    let log = RunLog::with_capture();
    let outcome = run(&cab, &Bindings::new(), &log, None).await.unwrap();
    assert_eq!(outcome.stderr_tail, ["oops"]);
    let warned = log
        .captured()
        .iter()
        .any(|(_, severity, line)| *severity == Severity::Warning && line == "oops");
    assert!(warned);
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let cab = cab("{command: '/bin/sleep 30'}");
    let log = RunLog::new();
    let started = std::time::Instant::now();
    let result = run(&cab, &Bindings::new(), &log, Some(Duration::from_millis(200))).await;
    assert!(matches!(result, Err(crate::RunError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn cancellation_interrupts_the_child() {
    let cab = cab("{command: '/bin/sleep 30'}");
    let plan = cab.invocation_plan("test.step", &Bindings::new(), None).unwrap();
    let log = RunLog::new();
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });
    let started = std::time::Instant::now();
    let result = run_cab(
        &cab,
        plan,
        Arc::new(NativeBackend::new()),
        &log,
        &cancel,
        None,
    )
    .await;
    assert!(matches!(result, Err(crate::RunError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_required_output_fails() {
    let cab = cab(
        r#"
command: /bin/true
outputs: {img: {dtype: File, required: true}}
"#,
    );
    let log = RunLog::new();
    let result = run(&cab, &bindings("{img: never-written.fits}"), &log, None).await;
    assert!(matches!(
        result,
        Err(crate::RunError::MissingRequiredOutput { output, .. }) if output == "img"
    ));
}

#[tokio::test]
async fn cleanup_patterns_are_removed_at_exit() {
    let dir = tempfile::TempDir::new().unwrap();
    let scratch = dir.path().join("scratch.tmp");

    let cab = Cab::parse(
        "toucher",
        &Value::from_yaml(
            serde_yaml::from_str(&format!(
                r#"
command: /bin/touch
inputs: {{file: {{dtype: File, policies: {{positional: true}}}}}}
management: {{cleanup: ['{}']}}
"#,
                scratch.display()
            ))
            .unwrap(),
        ),
    )
    .unwrap();

    let params = bindings(&format!("{{file: {}}}", scratch.display()));
    let log = RunLog::new();
    let outcome = run(&cab, &params, &log, None).await.unwrap();
    assert_eq!(outcome.status, CabStatus::Succeeded);
    assert!(!scratch.exists(), "cleanup should have removed the scratch file");
}

#[tokio::test]
async fn inline_code_results_come_back_via_marker() {
    // Only runs the generated driver through the system python; the
    // driver text itself is covered by plan tests.
    if !convoy_backend::executable_on_path("python3") {
        return;
    }
    let cab = cab(
        r#"
command: "answer = x * 2"
flavour: code
inputs: {x: int}
outputs: {answer: int}
"#,
    );
    let log = RunLog::new();
    let outcome = run(&cab, &bindings("{x: 21}"), &log, None).await.unwrap();
    assert_eq!(outcome.status, CabStatus::Succeeded);
    assert_eq!(outcome.outputs.get("answer"), Some(&Value::Int(42)));
}
