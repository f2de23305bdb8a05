// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use convoy_config::Value;

fn tree(yaml: &str) -> Value {
    Value::from_yaml(serde_yaml::from_str(yaml).unwrap())
}

#[test]
fn cab_reference_step() {
    let step = Step::parse(
        "image-1",
        &tree("{cab: wsclean, params: {ms: a.ms}, tags: [imaging]}"),
    )
    .unwrap();
    assert_eq!(step.label, "image-1");
    assert!(matches!(step.target, StepTarget::Cab(ref name) if name == "wsclean"));
    assert_eq!(step.params.get("ms"), Some(&Value::from("a.ms")));
    assert!(step.has_tag("imaging"));
    assert_eq!(step.cab_name(), Some("wsclean"));
}

#[test]
fn recipe_reference_step() {
    let step = Step::parse("selfcal", &tree("{recipe: selfcal-loop}")).unwrap();
    assert!(matches!(step.target, StepTarget::Recipe(ref name) if name == "selfcal-loop"));
    assert_eq!(step.cab_name(), None);
}

#[test]
fn inline_cab_step() {
    let step = Step::parse(
        "greet",
        &tree("{cab: {command: /bin/echo, inputs: {message: str}}}"),
    )
    .unwrap();
    match &step.target {
        StepTarget::InlineCab(cab) => {
            assert_eq!(cab.name, "greet");
            assert_eq!(cab.command, "/bin/echo");
        }
        other => panic!("expected inline cab, got {other:?}"),
    }
}

#[test]
fn inline_recipe_step() {
    let step = Step::parse(
        "sub",
        &tree("{recipe: {steps: {a: {cab: echo}}}}"),
    )
    .unwrap();
    match &step.target {
        StepTarget::InlineRecipe(recipe) => {
            assert_eq!(recipe.name, "sub");
            assert_eq!(recipe.steps.len(), 1);
        }
        other => panic!("expected inline recipe, got {other:?}"),
    }
}

#[test]
fn both_cab_and_recipe_is_rejected() {
    assert!(matches!(
        Step::parse("s", &tree("{cab: a, recipe: b}")),
        Err(RecipeError::Definition { .. })
    ));
}

#[test]
fn neither_cab_nor_recipe_is_rejected() {
    assert!(matches!(
        Step::parse("s", &tree("{params: {}}")),
        Err(RecipeError::Definition { .. })
    ));
}

#[test]
fn skip_forms() {
    let step = Step::parse("s", &tree("{cab: c, skip: true}")).unwrap();
    assert_eq!(step.skip, Some(Value::Bool(true)));

    let step = Step::parse("s", &tree("{cab: c, skip: '=recipe.skip_me'}")).unwrap();
    assert_eq!(step.skip, Some(Value::from("=recipe.skip_me")));
}

#[test]
fn skip_if_outputs_forms() {
    let step = Step::parse("s", &tree("{cab: c, skip_if_outputs: exist}")).unwrap();
    assert_eq!(step.skip_if_outputs, Some(SkipIfOutputs::Exist));
    let step = Step::parse("s", &tree("{cab: c, skip_if_outputs: fresh}")).unwrap();
    assert_eq!(step.skip_if_outputs, Some(SkipIfOutputs::Fresh));
    assert!(Step::parse("s", &tree("{cab: c, skip_if_outputs: maybe}")).is_err());
}

#[test]
fn step_assign_and_backend_are_kept() {
    let step = Step::parse(
        "s",
        &tree("{cab: c, assign: {log-level: debug}, backend: {select: [native]}}"),
    )
    .unwrap();
    assert_eq!(step.assign.get("log-level"), Some(&Value::from("debug")));
    assert!(step.backend.is_some());
}

#[test]
fn single_tag_string_form() {
    let step = Step::parse("s", &tree("{cab: c, tags: never}")).unwrap();
    assert!(step.has_tag("never"));
}
