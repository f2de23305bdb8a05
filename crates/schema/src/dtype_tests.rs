// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    str_short = { "str", DType::Str },
    str_long = { "string", DType::Str },
    int_short = { "int", DType::Int },
    int_long = { "integer", DType::Int },
    float = { "float", DType::Float },
    bool_short = { "bool", DType::Bool },
    file = { "File", DType::File },
    directory = { "Directory", DType::Directory },
    ms = { "MS", DType::MS },
    uri = { "URI", DType::URI },
)]
fn scalars(text: &str, expected: DType) {
    assert_eq!(DType::parse(text).unwrap(), expected);
}

#[test]
fn composites() {
    assert_eq!(
        DType::parse("List[File]").unwrap(),
        DType::List(Box::new(DType::File))
    );
    assert_eq!(
        DType::parse("Optional[int]").unwrap(),
        DType::Optional(Box::new(DType::Int))
    );
    assert_eq!(
        DType::parse("Union[int, str]").unwrap(),
        DType::Union(vec![DType::Int, DType::Str])
    );
    assert_eq!(
        DType::parse("Tuple[int, float, str]").unwrap(),
        DType::Tuple(vec![DType::Int, DType::Float, DType::Str])
    );
    assert_eq!(
        DType::parse("Dict[str, int]").unwrap(),
        DType::Dict(Box::new(DType::Str), Box::new(DType::Int))
    );
}

#[test]
fn nested_composites() {
    assert_eq!(
        DType::parse("List[Union[int, File]]").unwrap(),
        DType::List(Box::new(DType::Union(vec![DType::Int, DType::File])))
    );
    assert_eq!(
        DType::parse("Dict[str, List[int]]").unwrap(),
        DType::Dict(
            Box::new(DType::Str),
            Box::new(DType::List(Box::new(DType::Int)))
        )
    );
}

#[parameterized(
    unknown = { "Wibble" },
    empty = { "" },
    list_two_args = { "List[int, str]" },
    union_one_arg = { "Union[int]" },
    dict_one_arg = { "Dict[str]" },
)]
fn bad_dtypes(text: &str) {
    assert!(matches!(
        DType::parse(text),
        Err(SchemaError::BadDType { .. })
    ));
}

#[parameterized(
    file = { "File", true },
    ms = { "MS", true },
    list_of_files = { "List[File]", true },
    optional_dir = { "Optional[Directory]", true },
    union_with_file = { "Union[str, File]", true },
    plain_str = { "str", false },
    list_of_ints = { "List[int]", false },
)]
fn file_likeness(text: &str, expected: bool) {
    assert_eq!(DType::parse(text).unwrap().is_file_like(), expected);
}

#[test]
fn directory_likeness() {
    assert!(DType::parse("MS").unwrap().is_directory_like());
    assert!(DType::parse("List[Directory]").unwrap().is_directory_like());
    assert!(!DType::parse("File").unwrap().is_directory_like());
}

#[test]
fn display_round_trips() {
    for text in ["List[File]", "Union[int, str]", "Dict[str, List[int]]"] {
        let parsed = DType::parse(text).unwrap();
        assert_eq!(parsed.to_string(), text);
        assert_eq!(DType::parse(&parsed.to_string()).unwrap(), parsed);
    }
}
