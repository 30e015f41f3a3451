//! Object graph decoder: JSON text → typed instances, driven by descriptor
//! tables and doc-comment shape recovery.
//!
//! The decode is a single recursive descent over the parsed value tree. A
//! `Ctx` threads the current JSON path (for error messages) and the current
//! nesting depth through every recursive step; nothing else is mutable
//! between steps, and the first failure aborts the whole call.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::trace;

use crate::alias;
use crate::descriptor::{
    ClassDescriptor, Declared, EnumDescriptor, FieldDescriptor, Param, Registry, TypeDescriptor,
    TypeKind,
};
use crate::doctags::{self, Recovered};
use crate::dynamic::{value_kind, Described, Dynamic, Instance};
use crate::error::DecodeError;
use crate::path::JsonPath;

/// Hard bound on input nesting. The parser enforces its own recursion
/// limit for text input; this bound also covers value trees handed to
/// `decode_value` directly.
pub const MAX_DEPTH: usize = 128;

#[derive(Clone)]
struct Ctx {
    path: JsonPath,
    depth: usize,
}

impl Ctx {
    fn root() -> Self {
        Ctx {
            path: JsonPath::root(),
            depth: 0,
        }
    }

    fn key(&self, key: &str) -> Self {
        Ctx {
            path: self.path.key(key),
            depth: self.depth + 1,
        }
    }

    fn index(&self, index: usize) -> Self {
        Ctx {
            path: self.path.index(index),
            depth: self.depth + 1,
        }
    }
}

/// Handle passed to converters: the registry plus the position the
/// converter was dispatched at. Re-entrant decodes through it continue the
/// caller's path and depth accounting instead of starting over at the root.
pub struct Decoder<'a> {
    registry: &'a Registry,
    ctx: &'a Ctx,
}

impl Decoder<'_> {
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Decode an already-parsed value tree as `type_name`, continuing from
    /// the dispatch position.
    pub fn decode_value(&self, type_name: &str, value: &Value) -> Result<Instance, DecodeError> {
        self.registry.decode_value_at(type_name, value, self.ctx)
    }
}

impl Registry {
    /// Decode `json` into a new instance of the registered type `type_name`.
    pub fn decode(&self, json: &str, type_name: &str) -> Result<Instance, DecodeError> {
        trace!(type_name, "decoding into new instance");
        let value = crate::path::parse_value(json)?;
        let ctx = Ctx::root();
        let map = expect_object(&value, "the top-level value", &ctx)?;
        self.instantiate(type_name, map, &ctx)
    }

    /// Decode `json` into an existing instance: fields are populated in
    /// place, identity is preserved, the constructor is never re-run.
    pub fn decode_into(&self, json: &str, target: &mut Instance) -> Result<(), DecodeError> {
        trace!(type_name = target.type_name(), "decoding into existing instance");
        let value = crate::path::parse_value(json)?;
        let ctx = Ctx::root();
        let map = expect_object(&value, "the top-level value", &ctx)?;
        let entries: Vec<(&String, &Value)> = map.iter().collect();
        self.populate(target, &entries, &ctx)
    }

    /// Typed convenience over [`Registry::decode`].
    pub fn decode_as<T: Described>(&self, json: &str) -> Result<T, DecodeError> {
        Self::downcast::<T>(self.decode(json, T::TYPE_NAME)?)
    }

    /// Decode an already-parsed value tree as `type_name`, starting a
    /// fresh root context. Converter implementations go through
    /// [`Decoder::decode_value`] instead, which keeps the dispatch
    /// position.
    pub fn decode_value(&self, type_name: &str, value: &Value) -> Result<Instance, DecodeError> {
        self.decode_value_at(type_name, value, &Ctx::root())
    }

    fn decode_value_at(
        &self,
        type_name: &str,
        value: &Value,
        ctx: &Ctx,
    ) -> Result<Instance, DecodeError> {
        let map = expect_object(value, "the decoded value", ctx)?;
        self.instantiate(type_name, map, ctx)
    }

    fn class_descriptor(&self, name: &str) -> Result<(&TypeDescriptor, &ClassDescriptor), DecodeError> {
        let descriptor = self.descriptor(name).ok_or_else(|| DecodeError::UnknownType {
            name: name.to_owned(),
        })?;
        match &descriptor.kind {
            TypeKind::Class(class) => Ok((descriptor, class)),
            TypeKind::Enum(_) => Err(DecodeError::Mismatch {
                expected: format!("a class descriptor for \"{name}\""),
                got: "an enum descriptor".to_owned(),
                path: JsonPath::root(),
            }),
        }
    }

    /// Resolve constructor arguments in declaration order, instantiate,
    /// then apply any leftover keys to fields.
    fn instantiate(
        &self,
        type_name: &str,
        data: &Map<String, Value>,
        ctx: &Ctx,
    ) -> Result<Instance, DecodeError> {
        if ctx.depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep {
                limit: MAX_DEPTH,
                path: ctx.path.clone(),
            });
        }
        let (descriptor, class) = self.class_descriptor(type_name)?;
        let mut arguments = Vec::with_capacity(class.params.len());
        let mut consumed: HashSet<&str> = HashSet::new();
        for param in &class.params {
            let key = param.tag.resolved(param.name);
            match data.get(key) {
                Some(value) => {
                    arguments.push(self.resolve_argument(descriptor, class, param, value, &ctx.key(key))?);
                    consumed.insert(key);
                }
                None => match param.default {
                    Some(default) => arguments.push(default()),
                    None => {
                        return Err(DecodeError::MissingArgument {
                            type_name: descriptor.name,
                            param: param.name,
                            path: ctx.path.clone(),
                        });
                    }
                },
            }
        }
        let boxed = (class.construct)(arguments).map_err(|e| e.at(&ctx.path))?;
        let mut instance = Instance::from_parts(descriptor.name, boxed);
        let leftovers: Vec<(&String, &Value)> = data
            .iter()
            .filter(|(key, _)| !consumed.contains(key.as_str()))
            .collect();
        if !leftovers.is_empty() {
            self.populate(&mut instance, &leftovers, ctx)?;
        }
        Ok(instance)
    }

    /// Apply JSON keys to matching fields; unknown keys are silently
    /// ignored (forward compatibility).
    fn populate(
        &self,
        instance: &mut Instance,
        entries: &[(&String, &Value)],
        ctx: &Ctx,
    ) -> Result<(), DecodeError> {
        let (descriptor, class) = self.class_descriptor(instance.type_name())?;
        for (key, value) in entries {
            let field = class
                .fields
                .iter()
                .find(|f| f.tag.resolved(f.name) == key.as_str())
                .or_else(|| class.fields.iter().find(|f| f.name == key.as_str()));
            let Some(field) = field else {
                continue;
            };
            let fctx = ctx.key(key);
            let resolved = self.resolve_field_value(descriptor, field, value, &fctx)?;
            (field.set)(instance.value_mut(), resolved).map_err(|e| e.at(&fctx.path))?;
        }
        Ok(())
    }

    fn resolve_field_value(
        &self,
        descriptor: &TypeDescriptor,
        field: &FieldDescriptor,
        value: &Value,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        // Converter dispatch comes before any shape inspection: a
        // union-typed property without one fails no matter what the input
        // looks like.
        if let Some(name) = field.tag.converter {
            let converter = self.converter(name).ok_or(DecodeError::UnknownConverter {
                name,
                field: field.name,
                path: ctx.path.clone(),
            })?;
            let decoder = Decoder { registry: self, ctx };
            return converter(&decoder, value).map_err(|e| e.at(&ctx.path));
        }
        if matches!(field.declared, Declared::Union(_)) {
            return Err(DecodeError::NoConverter {
                field: field.name,
                path: ctx.path.clone(),
            });
        }
        match value {
            Value::Array(items) => match field.tag.element_type {
                Some(element) => {
                    let resolved = alias::resolve(element, &descriptor.location);
                    self.decode_items(&resolved, items, field.name, ctx)
                }
                None => Ok(Dynamic::from_value(value)),
            },
            Value::Object(map) => match field.declared {
                Declared::Named(name) => match self.descriptor(name) {
                    Some(nested) => match &nested.kind {
                        TypeKind::Class(_) => {
                            Ok(Dynamic::Object(self.instantiate(name, map, ctx)?))
                        }
                        TypeKind::Enum(en) => {
                            self.decode_enum(nested, en, value, field.name, ctx)
                        }
                    },
                    None => Err(DecodeError::UnknownFieldType {
                        field: field.name,
                        found: name.to_owned(),
                        path: ctx.path.clone(),
                    }),
                },
                Declared::Untyped => Err(DecodeError::UntypedField {
                    field: field.name,
                    path: ctx.path.clone(),
                }),
                Declared::Builtin(_) | Declared::Container => Ok(Dynamic::from_value(value)),
                Declared::Union(_) => unreachable!("union fields handled above"),
            },
            scalar => match field.declared {
                // Enum-typed fields accept backing values directly.
                Declared::Named(name) => match self.descriptor(name) {
                    Some(nested) => match &nested.kind {
                        TypeKind::Enum(en) => {
                            self.decode_enum(nested, en, scalar, field.name, ctx)
                        }
                        TypeKind::Class(_) => Ok(Dynamic::from_value(scalar)),
                    },
                    None => Ok(Dynamic::from_value(scalar)),
                },
                _ => Ok(Dynamic::from_value(scalar)),
            },
        }
    }

    /// Resolve one constructor parameter against its declared type.
    fn resolve_argument(
        &self,
        descriptor: &TypeDescriptor,
        class: &ClassDescriptor,
        param: &Param,
        value: &Value,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        // Explicitly tagged parameters go through their converter no
        // matter what their declared type is.
        if let Some(name) = param.tag.converter {
            let converter = self.converter(name).ok_or(DecodeError::UnknownConverter {
                name,
                field: param.name,
                path: ctx.path.clone(),
            })?;
            let decoder = Decoder { registry: self, ctx };
            return converter(&decoder, value).map_err(|e| e.at(&ctx.path));
        }
        if value.is_null() && param.nullable {
            return Ok(Dynamic::Null);
        }
        match &param.declared {
            Declared::Untyped | Declared::Builtin(_) => Ok(Dynamic::from_value(value)),
            Declared::Union(_) => Err(DecodeError::UnsupportedUnion {
                type_name: descriptor.name,
                param: param.name,
                path: ctx.path.clone(),
            }),
            Declared::Container => self.resolve_container(descriptor, class, param, value, ctx),
            Declared::Named(name) => match self.descriptor(name) {
                Some(nested) => match &nested.kind {
                    TypeKind::Class(_) => {
                        let map = expect_object_for_param(value, param.name, ctx)?;
                        Ok(Dynamic::Object(self.instantiate(name, map, ctx)?))
                    }
                    TypeKind::Enum(en) => self.decode_enum(nested, en, value, param.name, ctx),
                },
                None => Err(DecodeError::UnknownArgumentType {
                    type_name: descriptor.name,
                    param: param.name,
                    found: (*name).to_owned(),
                    path: ctx.path.clone(),
                }),
            },
        }
    }

    /// The element/value type of a container parameter must be recovered
    /// from the constructor doc comment.
    fn resolve_container(
        &self,
        descriptor: &TypeDescriptor,
        class: &ClassDescriptor,
        param: &Param,
        value: &Value,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        match value {
            Value::Array(items) => {
                match doctags::recover_list_item(class.doc, param.name, &descriptor.location) {
                    Recovered::Missing => Err(DecodeError::UndocumentedShape {
                        type_name: descriptor.name,
                        param: param.name,
                        path: ctx.path.clone(),
                    }),
                    Recovered::Malformed(found) => Err(DecodeError::MalformedShapeTag {
                        type_name: descriptor.name,
                        param: param.name,
                        found,
                        path: ctx.path.clone(),
                    }),
                    Recovered::Type(item_type) => {
                        self.decode_items(&item_type, items, param.name, ctx)
                    }
                }
            }
            Value::Object(map) => {
                match doctags::recover_map_value(class.doc, param.name, &descriptor.location) {
                    Recovered::Missing | Recovered::Malformed(_) => {
                        Err(DecodeError::UndocumentedShape {
                            type_name: descriptor.name,
                            param: param.name,
                            path: ctx.path.clone(),
                        })
                    }
                    Recovered::Type(value_type) => {
                        self.decode_entries(&value_type, map, param.name, ctx)
                    }
                }
            }
            other => Err(DecodeError::ExpectedArray {
                param: param.name,
                got: value_kind(other),
                path: ctx.path.clone(),
            }),
        }
    }

    /// Decode list items as `item_type` when it is constructible; pass them
    /// through unchanged otherwise.
    fn decode_items(
        &self,
        item_type: &str,
        items: &[Value],
        property: &'static str,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        let Some(nested) = self.descriptor(item_type) else {
            return Ok(Dynamic::List(items.iter().map(Dynamic::from_value).collect()));
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let ictx = ctx.index(i);
            match &nested.kind {
                TypeKind::Class(_) => match item {
                    Value::Object(map) => {
                        out.push(Dynamic::Object(self.instantiate(item_type, map, &ictx)?));
                    }
                    other => {
                        return Err(DecodeError::ExpectedObjectItems {
                            property,
                            got: value_kind(other),
                            path: ictx.path,
                        });
                    }
                },
                TypeKind::Enum(en) => {
                    out.push(self.decode_enum(nested, en, item, property, &ictx)?);
                }
            }
        }
        Ok(Dynamic::List(out))
    }

    /// Decode map entry values as `value_type` when it is constructible;
    /// keys are preserved and never validated.
    fn decode_entries(
        &self,
        value_type: &str,
        map: &Map<String, Value>,
        property: &'static str,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        let Some(nested) = self.descriptor(value_type) else {
            return Ok(Dynamic::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::from_value(v)))
                    .collect(),
            ));
        };
        let mut out = indexmap::IndexMap::with_capacity(map.len());
        for (key, entry) in map {
            let ectx = ctx.key(key);
            let decoded = match &nested.kind {
                TypeKind::Class(_) => match entry {
                    Value::Object(entry_map) => {
                        Dynamic::Object(self.instantiate(value_type, entry_map, &ectx)?)
                    }
                    other => {
                        return Err(DecodeError::ExpectedObjectItems {
                            property,
                            got: value_kind(other),
                            path: ectx.path,
                        });
                    }
                },
                TypeKind::Enum(en) => self.decode_enum(nested, en, entry, property, &ectx)?,
            };
            out.insert(key.clone(), decoded);
        }
        Ok(Dynamic::Map(out))
    }

    /// Look up an enum case by backing value. Only string and integer
    /// backings exist; everything else is a mismatch.
    fn decode_enum(
        &self,
        descriptor: &TypeDescriptor,
        en: &EnumDescriptor,
        value: &Value,
        param: &'static str,
        ctx: &Ctx,
    ) -> Result<Dynamic, DecodeError> {
        use crate::descriptor::CaseValue;

        if !en.is_backed() {
            return Err(DecodeError::UnsupportedEnum {
                enum_name: descriptor.name,
                param,
            });
        }
        let index = match value {
            Value::String(s) => en
                .cases
                .iter()
                .position(|case| matches!(case.value, Some(CaseValue::Str(v)) if v == s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => en
                    .cases
                    .iter()
                    .position(|case| matches!(case.value, Some(CaseValue::Int(v)) if v == i)),
                None => {
                    return Err(DecodeError::Mismatch {
                        expected: format!("a string or integer for parameter \"{param}\""),
                        got: "number".to_owned(),
                        path: ctx.path.clone(),
                    });
                }
            },
            other => {
                return Err(DecodeError::Mismatch {
                    expected: format!("a string or integer for parameter \"{param}\""),
                    got: value_kind(other).to_owned(),
                    path: ctx.path.clone(),
                });
            }
        };
        let Some(index) = index else {
            let valid = en
                .cases
                .iter()
                .filter_map(|case| case.value.as_ref().map(ToString::to_string))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DecodeError::InvalidEnumValue {
                value: match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                enum_name: descriptor.name,
                valid,
                path: ctx.path.clone(),
            });
        };
        Ok(Dynamic::Object(Instance::from_parts(
            descriptor.name,
            (en.make)(index),
        )))
    }
}

fn expect_object<'v>(
    value: &'v Value,
    context: &str,
    ctx: &Ctx,
) -> Result<&'v Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::ExpectedObject {
        context: context.to_owned(),
        got: value_kind(value),
        path: ctx.path.clone(),
    })
}

fn expect_object_for_param<'v>(
    value: &'v Value,
    param: &str,
    ctx: &Ctx,
) -> Result<&'v Map<String, Value>, DecodeError> {
    expect_object(value, &format!("parameter \"{param}\""), ctx)
}
