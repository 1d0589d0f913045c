// ============================================================================
// fieldbind Library
// ============================================================================

// Lets `#[derive(Record)]` expand to `::fieldbind::...` inside this crate too.
extern crate self as fieldbind;

pub mod bind;
pub mod core;
pub mod mapping;
pub mod server;
pub mod validate;
pub mod web;

// Re-export main types for convenience
pub use bind::{BindConfig, Binder, UpdateBinding};
pub use core::{BindError, BindResult, FieldViolation, ValidationError};
pub use mapping::{
    ColumnNameMapper, FieldDescriptor, FieldValues, GonicMapper, MapperKind, NameMappings,
    NameResolver, PrefixMapper, PresenceSets, Record, RecordDescriptor, SameMapper, SnakeMapper,
    StructureWalker, SuffixMapper,
};
pub use validate::{NoopValidator, TagValidator, Validator};

// Re-export the derive
pub use fieldbind_derive::Record;
