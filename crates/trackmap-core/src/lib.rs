//! Core types and traits for trackmap.
//!
//! This crate provides the foundations the identity-map utilities build on:
//!
//! - `Model` trait for ORM-style struct mapping
//! - `FieldInfo` / `SqlType` column metadata
//! - `Value` for dynamically-typed field values
//! - `KeyFieldReader` and its two providers, `ModelMetadata` and `MappingRegistry`
//! - The `Error` taxonomy shared by every trackmap crate

pub mod error;
pub mod field;
pub mod map_ext;
pub mod metadata;
pub mod model;
pub mod types;
pub mod value;

pub use error::{
    Error, FieldAccessError, FieldAccessErrorKind, InvalidArgumentError, MetadataError,
    MetadataErrorKind, Result,
};
pub use field::{FieldInfo, find_field};
pub use map_ext::GetOrDefault;
pub use metadata::{
    EntityMapping, KeyFieldReader, MappingRegistry, ModelMetadata, declared_key_fields,
    read_field,
};
pub use model::Model;
pub use types::SqlType;
pub use value::Value;
