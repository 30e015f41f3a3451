//! Object graph encoder: typed instances → JSON text.
//!
//! The structural inverse of the decoder's field-application step, not of
//! its constructor step: encoding only ever consults fields. Class
//! instances emit an ordered map keyed by the tag-resolved name in
//! field-declaration order; value-backed enum instances emit their backing
//! value; plain maps pass through without object-aware recursion.

use serde_json::{Map, Value};

use crate::descriptor::{CaseValue, Registry, TypeKind};
use crate::dynamic::{Dynamic, Instance};
use crate::error::EncodeError;

use crate::decode::MAX_DEPTH;

impl Registry {
    /// Encode a dynamic value as JSON text. Fails only for values with no
    /// JSON representation: unregistered instances, non-value-backed enum
    /// instances, and instances buried inside plain maps.
    pub fn encode(&self, value: &Dynamic) -> Result<String, EncodeError> {
        let tree = self.encode_value(value, 0)?;
        serde_json::to_string(&tree).map_err(|e| EncodeError::UnsupportedType {
            what: e.to_string(),
        })
    }

    fn encode_value(&self, value: &Dynamic, depth: usize) -> Result<Value, EncodeError> {
        if depth > MAX_DEPTH {
            return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
        }
        match value {
            Dynamic::Null => Ok(Value::Null),
            Dynamic::Bool(b) => Ok(Value::Bool(*b)),
            Dynamic::Number(n) => Ok(Value::Number(n.clone())),
            Dynamic::String(s) => Ok(Value::String(s.clone())),
            Dynamic::List(items) => items
                .iter()
                .map(|item| self.encode_value(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // The map's own serialization is trusted; no element recursion.
            Dynamic::Map(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, entry) in map {
                    out.insert(key.clone(), raw_value(entry, depth + 1)?);
                }
                Ok(Value::Object(out))
            }
            Dynamic::Object(instance) => self.encode_instance(instance, depth),
        }
    }

    fn encode_instance(&self, instance: &Instance, depth: usize) -> Result<Value, EncodeError> {
        let descriptor =
            self.descriptor(instance.type_name())
                .ok_or_else(|| EncodeError::UnsupportedType {
                    what: format!("unregistered type \"{}\"", instance.type_name()),
                })?;
        match &descriptor.kind {
            TypeKind::Enum(en) => {
                let index = (en.case_of)(instance.value());
                match en.cases.get(index).and_then(|case| case.value) {
                    Some(CaseValue::Str(s)) => Ok(Value::String(s.to_owned())),
                    Some(CaseValue::Int(i)) => Ok(Value::Number(i.into())),
                    None => Err(EncodeError::UnsupportedType {
                        what: format!("non-value-backed enum {}", descriptor.name),
                    }),
                }
            }
            TypeKind::Class(class) => {
                let mut out = Map::with_capacity(class.fields.len());
                for field in &class.fields {
                    let value = (field.get)(instance.value());
                    out.insert(
                        field.tag.resolved(field.name).to_owned(),
                        self.encode_value(&value, depth + 1)?,
                    );
                }
                Ok(Value::Object(out))
            }
        }
    }
}

/// Structural conversion for values inside plain maps: scalars, lists, and
/// nested maps convert as-is, but a typed instance has no trusted
/// serialization here.
fn raw_value(value: &Dynamic, depth: usize) -> Result<Value, EncodeError> {
    if depth > MAX_DEPTH {
        return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
    }
    match value {
        Dynamic::Null => Ok(Value::Null),
        Dynamic::Bool(b) => Ok(Value::Bool(*b)),
        Dynamic::Number(n) => Ok(Value::Number(n.clone())),
        Dynamic::String(s) => Ok(Value::String(s.clone())),
        Dynamic::List(items) => items
            .iter()
            .map(|item| raw_value(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Dynamic::Map(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, entry) in map {
                out.insert(key.clone(), raw_value(entry, depth + 1)?);
            }
            Ok(Value::Object(out))
        }
        Dynamic::Object(instance) => Err(EncodeError::UnsupportedType {
            what: format!(
                "instance of \"{}\" inside a plain map",
                instance.type_name()
            ),
        }),
    }
}
