//! Dynamic values exchanged between the engine and descriptor tables.
//!
//! `Dynamic` is the engine's working representation of a decoded value: the
//! six JSON shapes plus `Object`, a typed node of the materialized graph.
//! Constructor and setter functions receive `Dynamic` arguments and narrow
//! them with the typed accessors below; getters produce `Dynamic` back for
//! encoding.

use std::any::Any;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::error::DecodeError;
use crate::path::JsonPath;

/// Implemented by every type that has a descriptor in a registry. The name
/// must match the descriptor's registered name exactly.
pub trait Described: Any {
    const TYPE_NAME: &'static str;
}

/// A materialized object graph node: a concrete value behind `dyn Any`,
/// tagged with its registered type name.
#[derive(Debug)]
pub struct Instance {
    type_name: &'static str,
    value: Box<dyn Any>,
}

impl Instance {
    pub fn of<T: Described>(value: T) -> Self {
        Self {
            type_name: T::TYPE_NAME,
            value: Box::new(value),
        }
    }

    /// Wrap a value produced by a descriptor's construct function.
    pub fn from_parts(type_name: &'static str, value: Box<dyn Any>) -> Self {
        Self { type_name, value }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn value(&self) -> &dyn Any {
        &*self.value
    }

    pub fn value_mut(&mut self) -> &mut dyn Any {
        &mut *self.value
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn downcast<T: Any>(self) -> Result<T, Instance> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Instance { type_name, value }),
        }
    }
}

#[derive(Debug)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Dynamic>),
    Map(IndexMap<String, Dynamic>),
    Object(Instance),
}

/// Shape name of a raw JSON value, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Dynamic {
    /// Wrap a concrete value as a typed object node.
    pub fn of<T: Described>(value: T) -> Self {
        Dynamic::Object(Instance::of(value))
    }

    /// Structural conversion from a raw JSON value; no descriptors consulted.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(*b),
            Value::Number(n) => Dynamic::Number(n.clone()),
            Value::String(s) => Dynamic::String(s.clone()),
            Value::Array(items) => Dynamic::List(items.iter().map(Dynamic::from_value).collect()),
            Value::Object(map) => Dynamic::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::from_value(v)))
                    .collect(),
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "boolean",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "array",
            Dynamic::Map(_) => "object",
            Dynamic::Object(_) => "object instance",
        }
    }

    fn mismatch(expected: &str, got: &'static str) -> DecodeError {
        DecodeError::Mismatch {
            expected: expected.to_owned(),
            got: got.to_owned(),
            path: JsonPath::root(),
        }
    }

    /// `Null` becomes `None`; anything else is `Some(self)`.
    pub fn opt(self) -> Option<Dynamic> {
        match self {
            Dynamic::Null => None,
            other => Some(other),
        }
    }

    pub fn into_string(self) -> Result<String, DecodeError> {
        match self {
            Dynamic::String(s) => Ok(s),
            other => Err(Self::mismatch("a string", other.kind())),
        }
    }

    pub fn into_opt_string(self) -> Result<Option<String>, DecodeError> {
        self.opt().map(Dynamic::into_string).transpose()
    }

    pub fn into_bool(self) -> Result<bool, DecodeError> {
        match self {
            Dynamic::Bool(b) => Ok(b),
            other => Err(Self::mismatch("a boolean", other.kind())),
        }
    }

    pub fn into_i64(self) -> Result<i64, DecodeError> {
        match self {
            Dynamic::Number(n) => n
                .as_i64()
                .ok_or_else(|| Self::mismatch("an integer", "number")),
            other => Err(Self::mismatch("an integer", other.kind())),
        }
    }

    pub fn into_opt_i64(self) -> Result<Option<i64>, DecodeError> {
        self.opt().map(Dynamic::into_i64).transpose()
    }

    pub fn into_f64(self) -> Result<f64, DecodeError> {
        match self {
            Dynamic::Number(n) => n
                .as_f64()
                .ok_or_else(|| Self::mismatch("a number", "number")),
            other => Err(Self::mismatch("a number", other.kind())),
        }
    }

    pub fn into_list(self) -> Result<Vec<Dynamic>, DecodeError> {
        match self {
            Dynamic::List(items) => Ok(items),
            other => Err(Self::mismatch("an array", other.kind())),
        }
    }

    pub fn into_opt_list(self) -> Result<Option<Vec<Dynamic>>, DecodeError> {
        self.opt().map(Dynamic::into_list).transpose()
    }

    pub fn into_map(self) -> Result<IndexMap<String, Dynamic>, DecodeError> {
        match self {
            Dynamic::Map(map) => Ok(map),
            other => Err(Self::mismatch("an object", other.kind())),
        }
    }

    pub fn into_opt_map(self) -> Result<Option<IndexMap<String, Dynamic>>, DecodeError> {
        self.opt().map(Dynamic::into_map).transpose()
    }

    pub fn into_object<T: Described>(self) -> Result<T, DecodeError> {
        match self {
            Dynamic::Object(instance) => instance
                .downcast::<T>()
                .map_err(|got| Self::mismatch(&format!("an instance of {}", T::TYPE_NAME), got.type_name())),
            other => Err(Self::mismatch(
                &format!("an instance of {}", T::TYPE_NAME),
                other.kind(),
            )),
        }
    }

    pub fn into_opt_object<T: Described>(self) -> Result<Option<T>, DecodeError> {
        self.opt().map(Dynamic::into_object::<T>).transpose()
    }
}
