// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Cab;
use convoy_config::Value;

fn tree(yaml: &str) -> Value {
    Value::from_yaml(serde_yaml::from_str(yaml).unwrap())
}

fn bindings(yaml: &str) -> Bindings {
    match tree(yaml) {
        Value::Map(map) => map,
        _ => panic!("expected a mapping"),
    }
}

#[test]
fn binary_plan_uses_policy_argv() {
    let cab = Cab::parse(
        "echo",
        &tree("{command: /bin/echo, inputs: {message: {dtype: str, policies: {positional: true}}}}"),
    )
    .unwrap();
    let plan = cab
        .invocation_plan("demo.say", &bindings("{message: hello}"), None)
        .unwrap();
    assert_eq!(plan.argv, ["/bin/echo", "hello"]);
    assert_eq!(plan.fqname, "demo.say");
}

#[test]
fn plan_collects_file_outputs() {
    let cab = Cab::parse(
        "imager",
        &tree(
            r#"
command: imager
inputs: {prefix: str}
outputs:
  restored: {dtype: File, implicit: '{current.prefix}.fits'}
  log: File
"#,
        ),
    )
    .unwrap();
    let plan = cab
        .invocation_plan(
            "r.s",
            &bindings("{prefix: out, restored: out.fits, log: run.log}"),
            None,
        )
        .unwrap();
    let names: Vec<&str> = plan.outputs.iter().map(|o| o.param.as_str()).collect();
    assert_eq!(names, ["restored", "log"]);
    let restored = &plan.outputs[0];
    assert_eq!(restored.path, "out.fits");
    assert!(restored.required, "implicit outputs are expected on disk");
}

#[test]
fn plan_carries_environment_and_workdir() {
    let cab = Cab::parse(
        "c",
        &tree("{command: x, management: {environment: {A: 1}}}"),
    )
    .unwrap();
    let plan = cab
        .invocation_plan("r.s", &Bindings::new(), Some("/work".into()))
        .unwrap();
    assert_eq!(plan.env.get("A"), Some(&"1".to_string()));
    assert_eq!(plan.workdir.as_deref(), Some(std::path::Path::new("/work")));
}

#[test]
fn task_runner_plan_builds_driver_call() {
    let cab = Cab::parse(
        "tclean",
        &tree("{command: tclean, flavour: {kind: task-runner, interpreter: casa}, inputs: {vis: str, niter: int}}"),
    )
    .unwrap();
    let plan = cab
        .invocation_plan("r.s", &bindings("{vis: a.ms, niter: 100}"), None)
        .unwrap();
    assert_eq!(plan.argv[0], "casa");
    assert_eq!(plan.argv[1], "-c");
    assert_eq!(plan.argv[2], r#"tclean(vis="a.ms", niter=100)"#);
}

#[test]
fn task_runner_wrapper_prepends() {
    let cab = Cab::parse(
        "t",
        &tree("{command: t, flavour: {kind: task-runner, interpreter: casa, wrapper: xvfb-run}}"),
    )
    .unwrap();
    let plan = cab.invocation_plan("r.s", &Bindings::new(), None).unwrap();
    assert_eq!(plan.argv[0], "xvfb-run");
    assert_eq!(plan.argv[1], "casa");
}

#[test]
fn callable_driver_imports_and_prints_marker() {
    let cab = Cab::parse(
        "fit",
        &tree("{command: astropy.modeling.fit_gauss, flavour: callable, inputs: {x: int}}"),
    )
    .unwrap();
    let plan = cab.invocation_plan("r.s", &bindings("{x: 3}"), None).unwrap();
    let driver = &plan.argv[2];
    assert!(driver.contains("from astropy.modeling import fit_gauss"));
    assert!(driver.contains("fit_gauss(x=3)"));
    assert!(driver.contains(RESULT_MARKER));
}

#[test]
fn callable_without_module_is_rejected() {
    let cab = Cab::parse("f", &tree("{command: lonely, flavour: callable}")).unwrap();
    assert!(matches!(
        cab.invocation_plan("r.s", &Bindings::new(), None),
        Err(RecipeError::Definition { .. })
    ));
}

#[test]
fn inline_code_driver_binds_vars_and_collects_outputs() {
    let cab = Cab::parse(
        "calc",
        &tree(
            r#"
command: "answer = x * 2"
flavour: code
inputs: {x: int}
outputs: {answer: int}
"#,
        ),
    )
    .unwrap();
    let plan = cab.invocation_plan("r.s", &bindings("{x: 21}"), None).unwrap();
    let driver = &plan.argv[2];
    assert!(driver.contains("x = 21"));
    assert!(driver.contains("answer = x * 2"));
    assert!(driver.contains(r#""answer": answer"#));
    assert!(driver.contains(RESULT_MARKER));
}

#[test]
fn inline_code_dict_mode_passes_params() {
    let cab = Cab::parse(
        "calc",
        &tree(
            r#"
command: "answer = params['x']"
flavour: {kind: code, input_vars: false}
inputs: {x: int}
outputs: {answer: int}
"#,
        ),
    )
    .unwrap();
    let plan = cab.invocation_plan("r.s", &bindings("{x: 1}"), None).unwrap();
    assert!(plan.argv[2].contains(r#"params = {"x": 1}"#));
}

#[test]
fn python_literals_render_correctly() {
    let cab = Cab::parse(
        "t",
        &tree("{command: t, flavour: {kind: task-runner}, inputs: {a: bool, b: str, c: 'List[int]', d: float}}"),
    )
    .unwrap();
    let plan = cab
        .invocation_plan(
            "r.s",
            &bindings("{a: true, b: \"it's\", c: [1, 2], d: 0.5}"),
            None,
        )
        .unwrap();
    let driver = plan.argv.last().unwrap();
    assert!(driver.contains("a=True"));
    assert!(driver.contains(r#"b="it's""#));
    assert!(driver.contains("c=[1, 2]"));
    assert!(driver.contains("d=0.5"));
}
