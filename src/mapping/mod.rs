//! Presence-aware field mapping
//!
//! - `tags.rs` - parsing of external-name, column and rule tags
//! - `descriptor.rs` - per-record field tables (`Record` trait)
//! - `mapper.rs` - default column naming strategies
//! - `resolver.rs` - wire and column names for one field
//! - `walker.rs` - eligible-field lookup tables for a record
//! - `presence.rs` - payload keys to column / field name sets

pub mod descriptor;
pub mod mapper;
pub mod presence;
pub mod resolver;
pub mod tags;
pub mod walker;

pub use descriptor::{
    DescriptorFn, FieldDescriptor, FieldValues, Record, RecordDescriptor, RecordDescriptorBuilder,
    field_value, serialized_values,
};
pub use mapper::{
    ColumnNameMapper, GonicMapper, MapperKind, PrefixMapper, SameMapper, SnakeMapper, SuffixMapper,
};
pub use presence::{PresenceSets, translate};
pub use resolver::NameResolver;
pub use tags::ColumnOverride;
pub use walker::{NameMappings, StructureWalker};
