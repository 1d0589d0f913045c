use super::descriptor::FieldDescriptor;
use super::mapper::ColumnNameMapper;
use super::tags::{self, ColumnOverride};

/// Computes wire and storage names for single fields.
#[derive(Clone, Copy)]
pub struct NameResolver<'a> {
    mapper: &'a dyn ColumnNameMapper,
}

impl<'a> NameResolver<'a> {
    pub fn new(mapper: &'a dyn ColumnNameMapper) -> Self {
        Self { mapper }
    }

    /// Storage column for `field`; empty when the column tag is `"-"`.
    pub fn column_name(&self, field: &FieldDescriptor) -> String {
        match tags::parse_column_tag(field.raw_column_tag()) {
            ColumnOverride::Excluded => String::new(),
            ColumnOverride::Named(name) => name,
            ColumnOverride::Default => self.mapper.translate(field.name()),
        }
    }

    pub fn external_name(field: &FieldDescriptor) -> Option<&str> {
        tags::external_name(field.raw_json_tag())
    }
}
