//! Message schema model and compiler.
//!
//! A schema describes message classes (namespaces such as `telemetry` or
//! `datalink`), the messages in each class, and the typed fields of each
//! message. Raw attribute records are validated once into an immutable
//! [`SchemaModel`] that every codec consults read-only.

pub mod compiler;
pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod types;

pub use compiler::SchemaCompiler;
pub use config::SchemaConfig;
pub use error::{CompileErrors, LoadError, Result, SchemaError};
pub use model::{Enumeration, FieldDefinition, MessageClass, MessageDefinition, SchemaModel};
pub use source::{
    attrs, load_json, load_path, Attributes, ClassDocument, MessageDocument, RawRecord,
    SchemaDocument,
};
pub use types::{ArrayKind, BaseType, FieldType, MAX_FIELD_WIDTH};
