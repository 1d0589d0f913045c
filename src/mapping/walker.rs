use std::collections::{BTreeMap, HashMap};

use log::warn;

use super::descriptor::RecordDescriptor;
use super::mapper::ColumnNameMapper;
use super::resolver::NameResolver;
use super::tags::{self, IMMUTABLE_MARKERS};

/// Lookup tables keyed by external (wire) name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMappings {
    /// external name -> storage column (empty when the field is not stored)
    pub external_to_column: HashMap<String, String>,
    /// external name -> structural field name
    pub external_to_structural: HashMap<String, String>,
}

impl NameMappings {
    pub fn len(&self) -> usize {
        self.external_to_structural.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external_to_structural.is_empty()
    }

    pub fn column(&self, external: &str) -> Option<&str> {
        self.external_to_column.get(external).map(String::as_str)
    }

    pub fn structural(&self, external: &str) -> Option<&str> {
        self.external_to_structural.get(external).map(String::as_str)
    }

    fn merge(&mut self, other: NameMappings) {
        self.external_to_column.extend(other.external_to_column);
        self.external_to_structural.extend(other.external_to_structural);
    }
}

/// Flattens a record's descriptor into the fields a client may update.
///
/// A field is kept when it is settable, carries neither the `fixed` nor the
/// `zerotime` rule marker, and has an external name. Embedded records are
/// walked recursively and share the parent's namespace; on duplicate external
/// names the later declaration wins.
pub struct StructureWalker<'a> {
    resolver: NameResolver<'a>,
}

impl<'a> StructureWalker<'a> {
    pub fn new(mapper: &'a dyn ColumnNameMapper) -> Self {
        Self {
            resolver: NameResolver::new(mapper),
        }
    }

    pub fn walk(&self, record: &RecordDescriptor) -> NameMappings {
        let mut stack = Vec::new();
        self.walk_inner(record, &mut stack)
    }

    fn walk_inner(
        &self,
        record: &RecordDescriptor,
        stack: &mut Vec<*const RecordDescriptor>,
    ) -> NameMappings {
        let mut mappings = NameMappings::default();
        stack.push(record as *const RecordDescriptor);

        for field in record.fields() {
            if let Some(embedded) = field.embedded_descriptor() {
                if stack.contains(&(embedded as *const RecordDescriptor)) {
                    warn!(
                        "skipping embedded field '{}' of '{}': '{}' embeds itself",
                        field.name(),
                        record.name(),
                        embedded.name()
                    );
                    continue;
                }
                let nested = self.walk_inner(embedded, stack);
                mappings.merge(nested);
                continue;
            }

            if !field.is_settable() || tags::has_rule_marker(field.raw_validate_tag(), &IMMUTABLE_MARKERS) {
                continue;
            }
            let Some(external) = NameResolver::external_name(field) else {
                continue;
            };

            mappings
                .external_to_column
                .insert(external.to_string(), self.resolver.column_name(field));
            mappings
                .external_to_structural
                .insert(external.to_string(), field.name().to_string());
        }

        stack.pop();
        mappings
    }

    /// external name -> column for every stored field, updatable or not.
    ///
    /// Used when writing a whole record, where immutable and read-only fields
    /// are persisted too.
    pub fn storage_columns(&self, record: &RecordDescriptor) -> BTreeMap<String, String> {
        let mut columns = BTreeMap::new();
        let mut stack = Vec::new();
        self.collect_columns(record, &mut stack, &mut columns);
        columns
    }

    fn collect_columns(
        &self,
        record: &RecordDescriptor,
        stack: &mut Vec<*const RecordDescriptor>,
        columns: &mut BTreeMap<String, String>,
    ) {
        stack.push(record as *const RecordDescriptor);
        for field in record.fields() {
            if let Some(embedded) = field.embedded_descriptor() {
                if !stack.contains(&(embedded as *const RecordDescriptor)) {
                    self.collect_columns(embedded, stack, columns);
                }
                continue;
            }
            let Some(external) = NameResolver::external_name(field) else {
                continue;
            };
            let column = self.resolver.column_name(field);
            if !column.is_empty() {
                columns.insert(external.to_string(), column);
            }
        }
        stack.pop();
    }
}
