//! Descriptor tables: the metadata the engine reads instead of reflection.
//!
//! Each constructible type registers a `TypeDescriptor` describing its
//! constructor parameters, its fields, the tag metadata attached to them,
//! and the structured doc comment of its constructor. Descriptors carry
//! plain `fn` pointers for construction and field access, so a table can be
//! written by hand or emitted by codegen; the engine never cares which.

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::decode::Decoder;
use crate::dynamic::{Dynamic, Instance};
use crate::error::DecodeError;

/// Where a type was declared: its module path plus the raw `use` lines of
/// its source file. Both feed the per-location alias table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub module: &'static str,
    pub imports: &'static str,
}

/// Declarative metadata attached to a parameter or field.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tag {
    /// JSON key override; takes precedence over the raw name.
    pub rename: Option<&'static str>,
    /// Element type for a container field whose items are objects.
    /// Short names are resolved against the declaring location.
    pub element_type: Option<&'static str>,
    /// Named conversion routine for union-typed properties.
    pub converter: Option<&'static str>,
}

impl Tag {
    pub const NONE: Tag = Tag {
        rename: None,
        element_type: None,
        converter: None,
    };

    /// The JSON key this parameter or field answers to.
    pub fn resolved(&self, raw: &'static str) -> &'static str {
        self.rename.unwrap_or(raw)
    }
}

/// A parameter's or field's declared type, as far as the descriptor can
/// state it. Container element types are erased here; they are recovered
/// from the constructor doc comment.
#[derive(Clone, Copy, Debug)]
pub enum Declared {
    /// No declared type; values pass through unchanged.
    Untyped,
    /// A builtin scalar; the JSON value is trusted to match.
    Builtin(&'static str),
    /// A list or map; the element/value type must be recovered from docs.
    Container,
    /// A fully-qualified registered type name (class or enum).
    Named(&'static str),
    /// Two or more alternative object types.
    Union(&'static [&'static str]),
}

/// One constructor parameter, in declaration order.
pub struct Param {
    pub name: &'static str,
    pub declared: Declared,
    pub nullable: bool,
    /// Present iff the parameter is optional.
    pub default: Option<fn() -> Dynamic>,
    pub tag: Tag,
}

/// One declared field, in declaration order. Covers constructor-promoted
/// fields too; encoding and population go through this list only.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub declared: Declared,
    pub tag: Tag,
    pub get: fn(&dyn Any) -> Dynamic,
    pub set: fn(&mut dyn Any, Dynamic) -> Result<(), DecodeError>,
}

pub struct ClassDescriptor {
    /// Structured doc comment of the constructor, if any.
    pub doc: Option<&'static str>,
    pub params: Vec<Param>,
    pub fields: Vec<FieldDescriptor>,
    /// Builds an instance from resolved arguments in declaration order.
    pub construct: fn(Vec<Dynamic>) -> Result<Box<dyn Any>, DecodeError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseValue {
    Str(&'static str),
    Int(i64),
}

impl std::fmt::Display for CaseValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseValue::Str(s) => f.write_str(s),
            CaseValue::Int(n) => write!(f, "{n}"),
        }
    }
}

pub struct EnumCase {
    pub name: &'static str,
    /// Backing value; `None` for cases of a non-value-backed enumeration.
    pub value: Option<CaseValue>,
}

pub struct EnumDescriptor {
    pub cases: Vec<EnumCase>,
    /// Builds the case at the given index.
    pub make: fn(usize) -> Box<dyn Any>,
    /// Index of the case a given instance is.
    pub case_of: fn(&dyn Any) -> usize,
}

impl EnumDescriptor {
    pub fn is_backed(&self) -> bool {
        !self.cases.is_empty() && self.cases.iter().all(|c| c.value.is_some())
    }
}

pub enum TypeKind {
    Class(ClassDescriptor),
    Enum(EnumDescriptor),
}

pub struct TypeDescriptor {
    /// Fully-qualified name; the registry key.
    pub name: &'static str,
    pub location: SourceLocation,
    pub kind: TypeKind,
}

/// External conversion capability for union-typed properties. Receives the
/// raw JSON value and a [`Decoder`] handle positioned at the dispatch
/// site, so it can recursively materialize the variant it picks without
/// losing the caller's path or depth accounting.
pub type ConverterFn = fn(&Decoder<'_>, &Value) -> Result<Dynamic, DecodeError>;

/// The set of types and converters a decode/encode call can see.
#[derive(Default)]
pub struct Registry {
    types: HashMap<&'static str, TypeDescriptor>,
    converters: HashMap<&'static str, ConverterFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        debug!(type_name = descriptor.name, "registering type descriptor");
        self.types.insert(descriptor.name, descriptor);
    }

    pub fn register_converter(&mut self, name: &'static str, converter: ConverterFn) {
        debug!(converter = name, "registering converter");
        self.converters.insert(name, converter);
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn converter(&self, name: &str) -> Option<ConverterFn> {
        self.converters.get(name).copied()
    }

    /// Downcast helper for typed entry points.
    pub(crate) fn downcast<T: crate::dynamic::Described>(
        instance: Instance,
    ) -> Result<T, DecodeError> {
        instance.downcast::<T>().map_err(|got| DecodeError::Mismatch {
            expected: format!("an instance of {}", T::TYPE_NAME),
            got: got.type_name().to_owned(),
            path: crate::path::JsonPath::root(),
        })
    }
}
