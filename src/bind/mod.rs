//! Request body binding for create and partial-update handlers.
//!
//! `Binder` decodes a JSON body into a typed [`Record`], runs validation and,
//! for updates, reports which fields and storage columns the client actually
//! sent:
//!
//! ```
//! use std::sync::Arc;
//! use fieldbind::mapping::serialized_values;
//! use fieldbind::{
//!     BindResult, Binder, FieldDescriptor, FieldValues, Record, RecordDescriptor, SnakeMapper,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::sync::OnceLock;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Profile {
//!     name: String,
//!     bio: String,
//! }
//!
//! impl Record for Profile {
//!     fn descriptor() -> &'static RecordDescriptor {
//!         static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
//!         DESCRIPTOR.get_or_init(|| {
//!             RecordDescriptor::builder("Profile")
//!                 .field(FieldDescriptor::new("name").json_tag("name").column_tag("'display_name'"))
//!                 .field(FieldDescriptor::new("bio").json_tag("bio"))
//!                 .build()
//!         })
//!     }
//!
//!     fn field_values(&self) -> BindResult<FieldValues> {
//!         serialized_values(self)
//!     }
//! }
//!
//! let binder = Binder::new(Arc::new(SnakeMapper));
//! let update = binder.bind_slice_for_update::<Profile>(br#"{"name":"Ada"}"#).unwrap();
//! assert!(update.columns().contains("display_name"));
//! assert!(!update.columns().contains("bio"));
//! ```

mod config;

pub use config::{BindConfig, MAX_BODY_BYTES_ENV};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::core::{BindError, BindResult};
use crate::mapping::{ColumnNameMapper, NameMappings, PresenceSets, Record, StructureWalker, translate};
use crate::validate::{TagValidator, Validator};

/// Decode orchestrator shared by all handlers.
///
/// The column name mapper is injected once and only read afterwards, so a
/// single `Binder` can be cloned into every request.
#[derive(Clone)]
pub struct Binder {
    mapper: Arc<dyn ColumnNameMapper>,
    validator: Arc<dyn Validator>,
    config: BindConfig,
}

impl Binder {
    /// Binder using `mapper` for default column names and the [`TagValidator`].
    pub fn new(mapper: Arc<dyn ColumnNameMapper>) -> Self {
        Self {
            mapper,
            validator: Arc::new(TagValidator::new()),
            config: BindConfig::default(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_config(mut self, config: BindConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    pub fn mapper(&self) -> &dyn ColumnNameMapper {
        self.mapper.as_ref()
    }

    /// Name tables for `T`, freshly walked with this binder's mapper.
    pub fn mappings<T: Record>(&self) -> NameMappings {
        StructureWalker::new(self.mapper.as_ref()).walk(T::descriptor())
    }

    /// Create path: decode `body` into `T` and validate every field.
    pub fn bind<T, R>(&self, body: R) -> BindResult<T>
    where
        T: Record + DeserializeOwned,
        R: Read,
    {
        let bytes = self.read_body(body)?;
        self.bind_slice(&bytes)
    }

    pub fn bind_slice<T>(&self, body: &[u8]) -> BindResult<T>
    where
        T: Record + DeserializeOwned,
    {
        self.check_size(body.len())?;

        let record: T = decode(body, T::descriptor().name())?;
        let document = JsonValue::Object(record.field_values()?);
        self.validator.validate_for_create(T::descriptor(), &document)?;
        Ok(record)
    }

    /// Update path: decode `body` into `T`, recover the top-level keys the
    /// client sent and validate only the matching fields.
    ///
    /// The whole body is buffered first; see [`BindConfig`] for capping it.
    pub fn bind_for_update<T, R>(&self, body: R) -> BindResult<UpdateBinding<T>>
    where
        T: Record + DeserializeOwned,
        R: Read,
    {
        let bytes = self.read_body(body)?;
        self.bind_slice_for_update(&bytes)
    }

    pub fn bind_slice_for_update<T>(&self, body: &[u8]) -> BindResult<UpdateBinding<T>>
    where
        T: Record + DeserializeOwned,
    {
        self.check_size(body.len())?;

        let descriptor = T::descriptor();
        let record: T = decode(body, descriptor.name())?;
        let object: JsonMap<String, JsonValue> = decode(body, descriptor.name())?;
        let keys: BTreeSet<String> = object.into_iter().map(|(key, _)| key).collect();

        let mappings = self.mappings::<T>();
        let presence = translate(keys.iter().map(String::as_str), &mappings);
        debug!(
            "bound update for '{}': keys={:?} columns={:?} fields={:?}",
            descriptor.name(),
            keys,
            presence.columns,
            presence.fields
        );

        let document = JsonValue::Object(record.field_values()?);
        self.validator
            .validate_for_update(descriptor, &document, &presence.fields)?;

        Ok(UpdateBinding {
            record,
            keys,
            presence,
            mappings,
        })
    }

    fn read_body<R: Read>(&self, mut body: R) -> BindResult<Vec<u8>> {
        let mut buffer = Vec::new();
        match self.config.max_body_bytes {
            None => {
                body.read_to_end(&mut buffer)?;
            }
            Some(limit) => {
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                body.take(cap).read_to_end(&mut buffer)?;
            }
        }
        self.check_size(buffer.len())?;
        Ok(buffer)
    }

    fn check_size(&self, len: usize) -> BindResult<()> {
        match self.config.max_body_bytes {
            Some(limit) if len > limit => Err(BindError::BodyTooLarge { limit }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(body: &[u8], record: &str) -> BindResult<T> {
    serde_json::from_slice(body).map_err(|err| {
        debug!("failed to decode '{}' request body: {}", record, err);
        BindError::from(err)
    })
}

/// Result of the update path: the decoded record plus what the client sent.
#[derive(Debug, Clone)]
pub struct UpdateBinding<T> {
    record: T,
    keys: BTreeSet<String>,
    presence: PresenceSets,
    mappings: NameMappings,
}

impl<T> UpdateBinding<T> {
    pub fn record(&self) -> &T {
        &self.record
    }

    /// Top-level keys exactly as they appeared in the payload.
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn presence(&self) -> &PresenceSets {
        &self.presence
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.presence.columns
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.presence.fields
    }

    pub fn mappings(&self) -> &NameMappings {
        &self.mappings
    }

    /// True when no supplied key targets an updatable field.
    pub fn is_empty(&self) -> bool {
        self.presence.is_empty()
    }

    pub fn into_record(self) -> T {
        self.record
    }

    pub fn into_parts(self) -> (T, PresenceSets) {
        (self.record, self.presence)
    }
}

impl<T: Record> UpdateBinding<T> {
    /// New values keyed by storage column, for present column-backed keys only.
    ///
    /// Values come from [`Record::field_values`]. A present key with no value
    /// there is skipped, never written as null.
    pub fn changed_columns(&self) -> BindResult<BTreeMap<String, JsonValue>> {
        let mut values = self.record.field_values()?;
        let mut changes = BTreeMap::new();
        for key in &self.keys {
            let Some(column) = self.mappings.column(key) else {
                continue;
            };
            if column.is_empty() {
                continue;
            }
            match values.remove(key) {
                Some(value) => {
                    changes.insert(column.to_string(), value);
                }
                None => warn!(
                    "'{}' has no value for present key '{}'; column '{}' left unchanged",
                    T::descriptor().name(),
                    key,
                    column
                ),
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{
        FieldDescriptor, FieldValues, RecordDescriptor, SnakeMapper, field_value, serialized_values,
    };
    use crate::validate::NoopValidator;
    use serde::{Deserialize, Serialize};
    use std::io::Cursor;
    use std::sync::OnceLock;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Note {
        title: String,
        body: String,
        #[serde(skip_deserializing)]
        id: u64,
    }

    impl Record for Note {
        fn descriptor() -> &'static RecordDescriptor {
            static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                RecordDescriptor::builder("Note")
                    .field(FieldDescriptor::new("Title").json_tag("title").validate_tag("required"))
                    .field(FieldDescriptor::new("Body").json_tag("body").column_tag("'content'"))
                    .field(FieldDescriptor::new("ID").json_tag("id").readonly())
                    .build()
            })
        }

        fn field_values(&self) -> BindResult<FieldValues> {
            serialized_values(self)
        }
    }

    /// Exposes `label` only; `token` has no value.
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Badge {
        label: String,
        token: String,
    }

    impl Record for Badge {
        fn descriptor() -> &'static RecordDescriptor {
            static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                RecordDescriptor::builder("Badge")
                    .field(FieldDescriptor::new("Label").json_tag("label"))
                    .field(FieldDescriptor::new("Token").json_tag("token"))
                    .build()
            })
        }

        fn field_values(&self) -> BindResult<FieldValues> {
            let mut values = FieldValues::new();
            values.insert("label".to_string(), field_value("label", &self.label)?);
            Ok(values)
        }
    }

    fn binder() -> Binder {
        Binder::new(Arc::new(SnakeMapper))
    }

    #[test]
    fn create_path_runs_full_validation() {
        let err = binder().bind_slice::<Note>(br#"{"body":"text"}"#).unwrap_err();
        assert_eq!(err.validation().unwrap().fields(), vec!["Title"]);

        let note = binder()
            .bind(Cursor::new(br#"{"title":"hello","body":"text"}"#.to_vec()))
            .map(|note: Note| note.title)
            .unwrap();
        assert_eq!(note, "hello");
    }

    #[test]
    fn update_path_validates_only_present_fields() {
        let update = binder()
            .bind_slice_for_update::<Note>(br#"{"body":"new text"}"#)
            .unwrap();
        assert_eq!(update.columns().iter().collect::<Vec<_>>(), vec!["content"]);
        assert_eq!(update.fields().iter().collect::<Vec<_>>(), vec!["Body"]);
        assert_eq!(update.record().body, "new text");
    }

    #[test]
    fn update_path_ignores_readonly_and_unknown_keys() {
        let update = binder()
            .bind_slice_for_update::<Note>(br#"{"id":7,"extra":true}"#)
            .unwrap();
        assert!(update.is_empty());
        assert_eq!(update.keys().len(), 2);
    }

    #[test]
    fn malformed_json_is_a_decode_error_on_both_paths() {
        assert!(binder().bind_slice::<Note>(b"{\"title\":").unwrap_err().is_decode());
        assert!(binder()
            .bind_slice_for_update::<Note>(b"{\"title\":")
            .unwrap_err()
            .is_decode());
    }

    #[test]
    fn non_object_body_fails_update_decoding() {
        let binder = binder().with_validator(Arc::new(NoopValidator));
        assert!(binder.bind_slice_for_update::<Note>(b"[]").unwrap_err().is_decode());
    }

    #[test]
    fn changed_columns_reads_values_from_record() {
        let update = binder()
            .bind_slice_for_update::<Note>(br#"{"title":"t","body":"b"}"#)
            .unwrap();
        let changes = update.changed_columns().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["title"], JsonValue::from("t"));
        assert_eq!(changes["content"], JsonValue::from("b"));
    }

    #[test]
    fn body_limit_rejects_oversized_payloads() {
        let binder = binder().with_config(BindConfig::new().max_body_bytes(8));
        let body = br#"{"title":"much too long"}"#;

        let err = binder.bind_for_update::<Note, _>(Cursor::new(body.to_vec())).unwrap_err();
        assert!(matches!(err, BindError::BodyTooLarge { limit: 8 }));

        let err = binder.bind_slice::<Note>(body).unwrap_err();
        assert!(matches!(err, BindError::BodyTooLarge { limit: 8 }));
    }

    #[test]
    fn changed_columns_skip_keys_without_values() {
        let update = binder()
            .bind_slice_for_update::<Badge>(br#"{"label":"gold","token":"t-1"}"#)
            .unwrap();
        assert_eq!(update.record().token, "t-1");
        assert_eq!(update.columns().len(), 2);

        let changes = update.changed_columns().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["label"], JsonValue::from("gold"));
        assert!(!changes.contains_key("token"));
    }
}
