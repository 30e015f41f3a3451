//! Failure types for decode and encode.
//!
//! Two top-level kinds, nothing else: `DecodeError` for JSON → object graph,
//! `EncodeError` for the reverse. The engine never recovers internally; the
//! first structural mismatch aborts the whole call. Every message carries
//! enough context to find the offending value: the JSON path where one
//! exists, plus the declaring type and parameter for metadata failures.

use thiserror::Error;

use crate::path::JsonPath;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON at {path}: {message}")]
    Syntax { path: String, message: String },
    #[error("expected a JSON object for {context}, got {got} at {path}")]
    ExpectedObject {
        context: String,
        got: &'static str,
        path: JsonPath,
    },
    #[error("expected an array for parameter \"{param}\", got {got} at {path}")]
    ExpectedArray {
        param: &'static str,
        got: &'static str,
        path: JsonPath,
    },
    #[error("expected JSON objects for items in \"{property}\", got {got} at {path}")]
    ExpectedObjectItems {
        property: &'static str,
        got: &'static str,
        path: JsonPath,
    },
    #[error("missing required constructor argument \"{param}\" for {type_name} at {path}")]
    MissingArgument {
        type_name: &'static str,
        param: &'static str,
        path: JsonPath,
    },
    #[error("no descriptor registered for type \"{name}\"")]
    UnknownType { name: String },
    #[error(
        "constructor parameter \"{param}\" of {type_name} has type \"{found}\", \
         but no such type is registered (at {path})"
    )]
    UnknownArgumentType {
        type_name: &'static str,
        param: &'static str,
        found: String,
        path: JsonPath,
    },
    #[error("property \"{field}\" has unknown type \"{found}\" at {path}")]
    UnknownFieldType {
        field: &'static str,
        found: String,
        path: JsonPath,
    },
    #[error(
        "the container shape of constructor parameter \"{param}\" of {type_name} \
         is not documented (at {path})"
    )]
    UndocumentedShape {
        type_name: &'static str,
        param: &'static str,
        path: JsonPath,
    },
    #[error(
        "the doc type for constructor parameter \"{param}\" of {type_name} is wrong: \
         expected \"list<...>\", got \"{found}\" (at {path})"
    )]
    MalformedShapeTag {
        type_name: &'static str,
        param: &'static str,
        found: String,
        path: JsonPath,
    },
    #[error(
        "\"{value}\" is not a valid value for enum {enum_name} at {path}; \
         valid values are: {valid}"
    )]
    InvalidEnumValue {
        value: String,
        enum_name: &'static str,
        valid: String,
        path: JsonPath,
    },
    #[error("enum {enum_name} for parameter \"{param}\" has no backing values")]
    UnsupportedEnum {
        enum_name: &'static str,
        param: &'static str,
    },
    #[error(
        "constructor parameter \"{param}\" of {type_name} has a union type; \
         union constructor parameters are not supported (at {path})"
    )]
    UnsupportedUnion {
        type_name: &'static str,
        param: &'static str,
        path: JsonPath,
    },
    #[error("property \"{field}\" has a union type, but no converter is set (at {path})")]
    NoConverter {
        field: &'static str,
        path: JsonPath,
    },
    #[error("converter \"{name}\" for property \"{field}\" is not registered (at {path})")]
    UnknownConverter {
        name: &'static str,
        field: &'static str,
        path: JsonPath,
    },
    #[error("property \"{field}\" has no declared type at {path}")]
    UntypedField {
        field: &'static str,
        path: JsonPath,
    },
    #[error("expected {expected}, got {got} at {path}")]
    Mismatch {
        expected: String,
        got: String,
        path: JsonPath,
    },
    #[error("input nesting exceeds {limit} levels at {path}")]
    TooDeep { limit: usize, path: JsonPath },
}

impl DecodeError {
    /// Attach a location to a narrowing failure raised outside the
    /// decoder's own walk (descriptor construct/set functions and
    /// converters report mismatches without knowing where they are).
    pub(crate) fn at(self, at: &JsonPath) -> DecodeError {
        match self {
            DecodeError::Mismatch { expected, got, path } if path.is_root() => {
                DecodeError::Mismatch {
                    expected,
                    got,
                    path: at.clone(),
                }
            }
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unsupported value for encoding: {what}")]
    UnsupportedType { what: String },
    #[error("value nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}
