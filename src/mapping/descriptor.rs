//! Static field metadata for bindable records.
//!
//! A [`RecordDescriptor`] is the table of fields a record declares, in
//! declaration order, with the raw tag strings attached to each. It is built
//! once per type, either by `#[derive(Record)]` or by hand through
//! [`RecordDescriptor::builder`], and never mutated afterwards.
//!
//! ```
//! use fieldbind::{FieldDescriptor, RecordDescriptor};
//!
//! let descriptor = RecordDescriptor::builder("User")
//!     .field(FieldDescriptor::new("Name").json_tag("name").column_tag("'user_name'"))
//!     .field(FieldDescriptor::new("CreatedAt").json_tag("created_at").validate_tag("zerotime"))
//!     .build();
//!
//! assert_eq!(descriptor.fields().len(), 2);
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::core::{BindError, BindResult};

/// Field values keyed by external name.
pub type FieldValues = JsonMap<String, JsonValue>;

/// Implemented by every type that can be bound from a request body.
pub trait Record {
    fn descriptor() -> &'static RecordDescriptor;

    /// Current value of every field that has an external name, embedded
    /// records merged in.
    ///
    /// Values are read from the fields themselves, so fields the record never
    /// serializes (write-only secrets, `serialize_with`, asymmetric renames)
    /// are still seen by validation and column writes. `#[derive(Record)]`
    /// generates this; hand-written impls for symmetric serde types can use
    /// [`serialized_values`].
    fn field_values(&self) -> BindResult<FieldValues>;
}

/// Encodes one field value for [`Record::field_values`].
pub fn field_value<V: Serialize + ?Sized>(external: &str, value: &V) -> BindResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|err| BindError::Decode(format!("field '{}' cannot be encoded: {}", external, err)))
}

/// Field values taken from the record's own `Serialize` output.
///
/// Only correct when every named field serializes under its external name.
pub fn serialized_values<T: Serialize>(record: &T) -> BindResult<FieldValues> {
    match serde_json::to_value(record) {
        Ok(JsonValue::Object(values)) => Ok(values),
        Ok(other) => Err(BindError::Decode(format!(
            "record encodes as {} instead of an object",
            json_kind(&other)
        ))),
        Err(err) => Err(BindError::Decode(format!("record cannot be encoded: {}", err))),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Accessor for an embedded record's descriptor.
pub type DescriptorFn = fn() -> &'static RecordDescriptor;

#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    json_tag: String,
    column_tag: String,
    validate_tag: String,
    settable: bool,
    embedded: Option<DescriptorFn>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json_tag: String::new(),
            column_tag: String::new(),
            validate_tag: String::new(),
            settable: true,
            embedded: None,
        }
    }

    /// Declares an embedded sub-record whose fields are flattened into the parent.
    pub fn embedded<T: Record>(name: impl Into<String>) -> Self {
        Self {
            embedded: Some(T::descriptor as DescriptorFn),
            ..Self::new(name)
        }
    }

    pub fn json_tag(mut self, tag: impl Into<String>) -> Self {
        self.json_tag = tag.into();
        self
    }

    pub fn column_tag(mut self, tag: impl Into<String>) -> Self {
        self.column_tag = tag.into();
        self
    }

    pub fn validate_tag(mut self, tag: impl Into<String>) -> Self {
        self.validate_tag = tag.into();
        self
    }

    /// Marks the field as not writable by clients.
    pub fn readonly(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn settable(mut self, settable: bool) -> Self {
        self.settable = settable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_json_tag(&self) -> &str {
        &self.json_tag
    }

    pub fn raw_column_tag(&self) -> &str {
        &self.column_tag
    }

    pub fn raw_validate_tag(&self) -> &str {
        &self.validate_tag
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    pub fn embedded_descriptor(&self) -> Option<&'static RecordDescriptor> {
        self.embedded.map(|descriptor| descriptor())
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("json_tag", &self.json_tag)
            .field("column_tag", &self.column_tag)
            .field("validate_tag", &self.validate_tag)
            .field("settable", &self.settable)
            .field(
                "embedded",
                &self.embedded_descriptor().map(RecordDescriptor::name),
            )
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn builder(name: impl Into<String>) -> RecordDescriptorBuilder {
        RecordDescriptorBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub struct RecordDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptorBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn embed<T: Record>(self, name: impl Into<String>) -> Self {
        self.field(FieldDescriptor::embedded::<T>(name))
    }

    pub fn build(self) -> RecordDescriptor {
        RecordDescriptor {
            name: self.name,
            fields: self.fields,
        }
    }
}
