//! Type-directed JSON decode/encode over declared descriptor tables.
//!
//! Maps between JSON text and statically-declared object graphs without
//! hand-written marshaling code. Types register a descriptor (constructor
//! parameters, fields, tag metadata, constructor doc comment) with a
//! [`Registry`]; the decoder reconciles JSON keys against that metadata and
//! recursively materializes nested objects, lists, maps, enumerations, and
//! converter-resolved unions. Container element types are erased in the
//! descriptors, so they are recovered from structured `@param` doc tags and
//! resolved through per-location alias tables.
//!
//! Design notes:
//! - One-shot, in-memory, whole-document decode/encode; no streaming.
//! - Fail-fast: no partial object graphs, every error carries a JSON path.
//! - Unknown JSON keys are tolerated (forward compatibility); unresolvable
//!   container shapes never are.
//! - The only cross-call state is the per-location alias table cache.

pub mod alias;
pub mod decode;
pub mod descriptor;
pub mod doctags;
pub mod dynamic;
pub mod encode;
pub mod error;
pub mod path;


pub use decode::{Decoder, MAX_DEPTH};
pub use descriptor::{
    CaseValue, ClassDescriptor, ConverterFn, Declared, EnumCase, EnumDescriptor, FieldDescriptor,
    Param, Registry, SourceLocation, Tag, TypeDescriptor, TypeKind,
};
pub use dynamic::{Described, Dynamic, Instance};
pub use error::{DecodeError, EncodeError};
pub use path::JsonPath;
