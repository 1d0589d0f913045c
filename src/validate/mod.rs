//! Record validation collaborators
//!
//! The binder hands a validator the record's descriptor together with a JSON
//! object holding the decoded field values keyed by external name (see
//! [`Record::field_values`](crate::mapping::Record::field_values)), so
//! implementations stay object safe and can be shared behind an `Arc`.

mod rules;

use std::collections::BTreeSet;

use serde_json::Value as JsonValue;

use crate::core::ValidationError;
use crate::mapping::RecordDescriptor;

pub use rules::TagValidator;

pub trait Validator: Send + Sync {
    /// Checks every field of a freshly created record.
    fn validate_for_create(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
    ) -> Result<(), ValidationError>;

    /// Checks only the fields whose structural names are in `allowed`.
    fn validate_for_update(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
        allowed: &BTreeSet<String>,
    ) -> Result<(), ValidationError>;
}

/// Accepts every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate_for_create(&self, _: &RecordDescriptor, _: &JsonValue) -> Result<(), ValidationError> {
        Ok(())
    }

    fn validate_for_update(
        &self,
        _: &RecordDescriptor,
        _: &JsonValue,
        _: &BTreeSet<String>,
    ) -> Result<(), ValidationError> {
        Ok(())
    }
}
