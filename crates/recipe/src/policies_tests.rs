// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use convoy_config::Value;
use convoy_schema::parse_schema_set;

fn tree(yaml: &str) -> Value {
    Value::from_yaml(serde_yaml::from_str(yaml).unwrap())
}

fn bindings(yaml: &str) -> Bindings {
    match tree(yaml) {
        Value::Map(map) => map,
        _ => panic!("expected a mapping"),
    }
}

fn argv(inputs_yaml: &str, cab_policies_yaml: &str, params_yaml: &str) -> Vec<String> {
    let inputs = parse_schema_set(&tree(inputs_yaml)).unwrap();
    let outputs = SchemaSet::new();
    let policies = Policies::parse(&tree(cab_policies_yaml)).unwrap();
    build_argv("/bin/tool", &inputs, &outputs, &policies, &bindings(params_yaml)).unwrap()
}

use convoy_schema::SchemaSet;

#[test]
fn basic_keyed_options_in_schema_order() {
    let args = argv(
        "{alpha: str, beta: int}",
        "{}",
        "{beta: 2, alpha: a}",
    );
    // Schema declaration order wins over binding order
    assert_eq!(args, ["/bin/tool", "--alpha", "a", "--beta", "2"]);
}

#[test]
fn command_with_fixed_arguments_splits() {
    let inputs = parse_schema_set(&tree("{x: int}")).unwrap();
    let args = build_argv(
        "/bin/env tool --fixed",
        &inputs,
        &SchemaSet::new(),
        &Policies::default(),
        &bindings("{x: 1}"),
    )
    .unwrap();
    assert_eq!(args, ["/bin/env", "tool", "--fixed", "--x", "1"]);
}

#[test]
fn custom_prefix_and_key_value() {
    let args = argv("{mode: str}", "{prefix: '-', key_value: true}", "{mode: fast}");
    assert_eq!(args, ["/bin/tool", "-mode=fast"]);
}

#[test]
fn nom_de_guerre_renames_option() {
    let args = argv(
        "{ms: {dtype: MS, nom_de_guerre: vis}}",
        "{}",
        "{ms: a.ms}",
    );
    assert_eq!(args, ["/bin/tool", "--vis", "a.ms"]);
}

#[test]
fn replace_policy_rewrites_name() {
    let args = argv(
        "{data-column: {dtype: str, policies: {replace: {'-': '_'}}}}",
        "{}",
        "{data-column: DATA}",
    );
    assert_eq!(args, ["/bin/tool", "--data_column", "DATA"]);
}

#[test]
fn bool_true_is_bare_flag_false_is_omitted() {
    let args = argv("{verbose: bool, quiet: bool}", "{}", "{verbose: true, quiet: false}");
    assert_eq!(args, ["/bin/tool", "--verbose"]);
}

#[test]
fn explicit_true_false_render_values() {
    let args = argv(
        "{feature: {dtype: bool, policies: {explicit_true: 'on', explicit_false: 'off'}}}",
        "{}",
        "{feature: false}",
    );
    assert_eq!(args, ["/bin/tool", "--feature", "off"]);
}

#[test]
fn positional_goes_last_positional_head_first() {
    let args = argv(
        r#"
src: {dtype: File, policies: {positional_head: true}}
mode: str
dst: {dtype: File, policies: {positional: true}}
"#,
        "{}",
        "{src: in.fits, dst: out.fits, mode: copy}",
    );
    assert_eq!(
        args,
        ["/bin/tool", "in.fits", "--mode", "copy", "out.fits"]
    );
}

#[test]
fn list_default_rendering_is_one_key_many_values() {
    let args = argv("{chans: 'List[int]'}", "{}", "{chans: [1, 2, 3]}");
    assert_eq!(args, ["/bin/tool", "--chans", "1", "2", "3"]);
}

#[test]
fn repeat_repeat_duplicates_the_key() {
    let args = argv(
        "{chans: {dtype: 'List[int]', policies: {repeat: repeat}}}",
        "{}",
        "{chans: [1, 2]}",
    );
    assert_eq!(args, ["/bin/tool", "--chans", "1", "--chans", "2"]);
}

#[test]
fn repeat_brackets_packs_a_flow_list() {
    let args = argv(
        "{chans: {dtype: 'List[int]', policies: {repeat: '[]'}}}",
        "{}",
        "{chans: [1, 2]}",
    );
    assert_eq!(args, ["/bin/tool", "--chans", "[1,2]"]);
}

#[test]
fn repeat_separator_joins() {
    let args = argv(
        "{chans: {dtype: 'List[int]', policies: {repeat: ','}}}",
        "{}",
        "{chans: [1, 2, 3]}",
    );
    assert_eq!(args, ["/bin/tool", "--chans", "1,2,3"]);
}

#[test]
fn split_policy_splits_string_first() {
    let args = argv(
        "{spw: {dtype: str, policies: {split: ';', repeat: repeat}}}",
        "{}",
        "{spw: '0;1'}",
    );
    assert_eq!(args, ["/bin/tool", "--spw", "0", "--spw", "1"]);
}

#[test]
fn skip_policy_omits_parameter() {
    let args = argv(
        "{internal: {dtype: str, policies: {skip: true}}, kept: str}",
        "{}",
        "{internal: x, kept: y}",
    );
    assert_eq!(args, ["/bin/tool", "--kept", "y"]);
}

#[test]
fn skip_implicits_omits_implicit_outputs() {
    let inputs = parse_schema_set(&tree("{prefix: str}")).unwrap();
    let outputs =
        parse_schema_set(&tree("{img: {dtype: File, implicit: '{current.prefix}.fits'}}"))
            .unwrap();
    let policies = Policies::parse(&tree("{skip_implicits: true}")).unwrap();
    let args = build_argv(
        "/bin/tool",
        &inputs,
        &outputs,
        &policies,
        &bindings("{prefix: out, img: out.fits}"),
    )
    .unwrap();
    assert_eq!(args, ["/bin/tool", "--prefix", "out"]);
}

#[test]
fn missing_param_is_omitted_unless_pass_missing_as_none() {
    let args = argv("{a: str, b: str}", "{}", "{a: x}");
    assert_eq!(args, ["/bin/tool", "--a", "x"]);

    let args = argv(
        "{a: str, b: {dtype: str, policies: {pass_missing_as_none: true}}}",
        "{}",
        "{a: x}",
    );
    assert_eq!(args, ["/bin/tool", "--a", "x", "--b", "None"]);
}

#[test]
fn format_template_applies_elementwise() {
    let args = argv(
        "{scales: {dtype: 'List[int]', policies: {format: 'scale-{value}'}}}",
        "{}",
        "{scales: [1, 2]}",
    );
    assert_eq!(args, ["/bin/tool", "--scales", "scale-1", "scale-2"]);
}

#[test]
fn format_list_consumes_elements() {
    let args = argv(
        "{size: {dtype: 'List[int]', policies: {format_list: ['{value}px', 'x{value}']}}}",
        "{}",
        "{size: [640, 480]}",
    );
    assert_eq!(args, ["/bin/tool", "--size", "640px", "x480"]);
}

#[test]
fn format_list_scalar_sees_other_params() {
    let args = argv(
        r#"
prefix: str
out: {dtype: str, policies: {format_list_scalar: ['{prefix}-{value}.fits', '{prefix}-{value}.log']}}
"#,
        "{}",
        "{prefix: run1, out: img}",
    );
    assert_eq!(
        args,
        [
            "/bin/tool",
            "--prefix",
            "run1",
            "--out",
            "run1-img.fits",
            "run1-img.log"
        ]
    );
}

#[test]
fn format_referencing_unknown_param_errors() {
    let inputs = parse_schema_set(&tree(
        "{out: {dtype: str, policies: {format: '{nope}-{value}'}}}",
    ))
    .unwrap();
    let result = build_argv(
        "/bin/tool",
        &inputs,
        &SchemaSet::new(),
        &Policies::default(),
        &bindings("{out: x}"),
    );
    assert!(matches!(result, Err(RecipeError::Definition { .. })));
}

#[test]
fn split_command_honors_quotes() {
    assert_eq!(
        split_command(r#"/bin/sh -c "exit 7""#),
        ["/bin/sh", "-c", "exit 7"]
    );
    assert_eq!(
        split_command("echo 'two words' plain"),
        ["echo", "two words", "plain"]
    );
    assert_eq!(split_command("  spaced   out  "), ["spaced", "out"]);
    assert_eq!(split_command("a ''"), ["a", ""]);
}

#[test]
fn cab_policies_merge_with_param_overrides() {
    let cab = Policies::parse(&tree("{prefix: '-', repeat: ','}")).unwrap();
    let param = Policies::parse(&tree("{repeat: repeat}")).unwrap();
    let merged = cab.merged_with(&param);
    assert_eq!(merged.prefix.as_deref(), Some("-"));
    assert_eq!(merged.repeat.as_deref(), Some("repeat"));
}

#[test]
fn unknown_policy_field_is_rejected() {
    assert!(Policies::parse(&tree("{wibble: 1}")).is_err());
}
