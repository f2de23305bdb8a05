// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dtype grammar
//!
//! Scalars (`str`, `int`, `float`, `bool`), file-likes (`File`,
//! `Directory`, `MS`, `URI`) and composites (`List[T]`, `Tuple[T, ...]`,
//! `Union[T, ...]`, `Dict[K, V]`, `Optional[T]`).

use crate::SchemaError;
use std::fmt;

/// A parameter's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    Str,
    Int,
    Float,
    Bool,
    /// A regular file path.
    File,
    /// A directory path.
    Directory,
    /// A measurement-set directory (table-like; treated as a directory).
    MS,
    /// A remote or local resource locator.
    URI,
    List(Box<DType>),
    Tuple(Vec<DType>),
    Union(Vec<DType>),
    Dict(Box<DType>, Box<DType>),
    Optional(Box<DType>),
}

impl DType {
    /// Parse a dtype expression like `List[File]` or `Union[int, str]`.
    pub fn parse(text: &str) -> Result<DType, SchemaError> {
        let trimmed = text.trim();
        let bad = |message: &str| SchemaError::BadDType {
            text: text.to_string(),
            message: message.to_string(),
        };

        if let Some((head, args)) = split_generic(trimmed) {
            let parts = split_args(args);
            return match head {
                "List" => match parts.as_slice() {
                    [one] => Ok(DType::List(Box::new(DType::parse(one)?))),
                    _ => Err(bad("List takes exactly one type argument")),
                },
                "Optional" => match parts.as_slice() {
                    [one] => Ok(DType::Optional(Box::new(DType::parse(one)?))),
                    _ => Err(bad("Optional takes exactly one type argument")),
                },
                "Tuple" => {
                    if parts.is_empty() {
                        return Err(bad("Tuple needs at least one type argument"));
                    }
                    Ok(DType::Tuple(
                        parts.iter().map(|p| DType::parse(p)).collect::<Result<_, _>>()?,
                    ))
                }
                "Union" => {
                    if parts.len() < 2 {
                        return Err(bad("Union needs at least two type arguments"));
                    }
                    Ok(DType::Union(
                        parts.iter().map(|p| DType::parse(p)).collect::<Result<_, _>>()?,
                    ))
                }
                "Dict" => match parts.as_slice() {
                    [k, v] => Ok(DType::Dict(
                        Box::new(DType::parse(k)?),
                        Box::new(DType::parse(v)?),
                    )),
                    _ => Err(bad("Dict takes exactly two type arguments")),
                },
                _ => Err(bad("unknown composite type")),
            };
        }

        match trimmed {
            "str" | "string" => Ok(DType::Str),
            "int" | "integer" => Ok(DType::Int),
            "float" => Ok(DType::Float),
            "bool" | "boolean" => Ok(DType::Bool),
            "File" => Ok(DType::File),
            "Directory" => Ok(DType::Directory),
            "MS" => Ok(DType::MS),
            "URI" => Ok(DType::URI),
            "" => Err(bad("empty dtype")),
            _ => Err(bad("unknown type")),
        }
    }

    /// Whether values of this type name filesystem objects (recursing
    /// into composites).
    pub fn is_file_like(&self) -> bool {
        match self {
            DType::File | DType::Directory | DType::MS | DType::URI => true,
            DType::List(inner) | DType::Optional(inner) => inner.is_file_like(),
            DType::Union(parts) | DType::Tuple(parts) => {
                parts.iter().any(DType::is_file_like)
            }
            _ => false,
        }
    }

    /// Whether this file-like type names a directory on disk.
    pub fn is_directory_like(&self) -> bool {
        match self {
            DType::Directory | DType::MS => true,
            DType::List(inner) | DType::Optional(inner) => inner.is_directory_like(),
            _ => false,
        }
    }
}

/// Split `Head[args]` into its parts, or `None` for a plain name.
fn split_generic(text: &str) -> Option<(&str, &str)> {
    let open = text.find('[')?;
    let close = text.rfind(']')?;
    if close != text.len() - 1 {
        return None;
    }
    Some((&text[..open], &text[open + 1..close]))
}

/// Split comma-separated type arguments at bracket depth zero.
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Str => f.write_str("str"),
            DType::Int => f.write_str("int"),
            DType::Float => f.write_str("float"),
            DType::Bool => f.write_str("bool"),
            DType::File => f.write_str("File"),
            DType::Directory => f.write_str("Directory"),
            DType::MS => f.write_str("MS"),
            DType::URI => f.write_str("URI"),
            DType::List(t) => write!(f, "List[{t}]"),
            DType::Optional(t) => write!(f, "Optional[{t}]"),
            DType::Tuple(parts) => {
                f.write_str("Tuple[")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str("]")
            }
            DType::Union(parts) => {
                f.write_str("Union[")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str("]")
            }
            DType::Dict(k, v) => write!(f, "Dict[{k}, {v}]"),
        }
    }
}

#[cfg(test)]
#[path = "dtype_tests.rs"]
mod tests;
