use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;

use super::Validator;
use crate::core::{FieldViolation, ValidationError};
use crate::mapping::tags::{self, Rule, RuleGroup};
use crate::mapping::{FieldDescriptor, NameResolver, RecordDescriptor};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$").unwrap();
}

/// Evaluates the rules written in each field's validation tag.
///
/// Supported rules: `required`, `min=N`, `max=N`, `len=N`, `email`, `fixed`,
/// `zerotime`. Groups separated by `,` must all pass; alternatives separated
/// by `|` pass when any of them passes. Apart from `required`, rules accept
/// an absent or null value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagValidator;

impl TagValidator {
    pub fn new() -> Self {
        Self
    }

    fn check_record(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
        allowed: Option<&BTreeSet<String>>,
        violations: &mut Vec<FieldViolation>,
    ) {
        let mut stack = Vec::new();
        self.check_fields(record, document, allowed, &mut stack, violations);
    }

    fn check_fields(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
        allowed: Option<&BTreeSet<String>>,
        stack: &mut Vec<*const RecordDescriptor>,
        violations: &mut Vec<FieldViolation>,
    ) {
        stack.push(record as *const RecordDescriptor);

        for field in record.fields() {
            if let Some(embedded) = field.embedded_descriptor() {
                if !stack.contains(&(embedded as *const RecordDescriptor)) {
                    self.check_fields(embedded, document, allowed, stack, violations);
                }
                continue;
            }

            if let Some(allowed) = allowed {
                if !allowed.contains(field.name()) {
                    continue;
                }
            }

            let Some(external) = NameResolver::external_name(field) else {
                continue;
            };
            let value = document.get(external);
            for group in tags::parse_rules(field.raw_validate_tag()) {
                if let Some(violation) = check_group(field, external, &group, value) {
                    violations.push(violation);
                }
            }
        }

        stack.pop();
    }
}

impl Validator for TagValidator {
    fn validate_for_create(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
    ) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        self.check_record(record, document, None, &mut violations);
        finish(violations)
    }

    fn validate_for_update(
        &self,
        record: &RecordDescriptor,
        document: &JsonValue,
        allowed: &BTreeSet<String>,
    ) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        self.check_record(record, document, Some(allowed), &mut violations);
        finish(violations)
    }
}

fn finish(violations: Vec<FieldViolation>) -> Result<(), ValidationError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

fn check_group(
    field: &FieldDescriptor,
    external: &str,
    group: &RuleGroup,
    value: Option<&JsonValue>,
) -> Option<FieldViolation> {
    let mut failures = Vec::with_capacity(group.alternatives.len());
    for rule in &group.alternatives {
        match check_rule(rule, value) {
            Ok(()) => return None,
            Err(message) => failures.push((rule.key.as_str(), message)),
        }
    }

    let rule = failures.iter().map(|(key, _)| *key).collect::<Vec<_>>().join("|");
    let message = failures
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join(" or ");
    Some(FieldViolation::new(field.name(), external, rule, message))
}

fn check_rule(rule: &Rule, value: Option<&JsonValue>) -> Result<(), String> {
    let present = value.filter(|value| !value.is_null());

    match rule.key.as_str() {
        "required" => match present {
            Some(value) if !is_empty_value(value) => Ok(()),
            _ => Err("value is required".to_string()),
        },
        "min" => bound(rule, present, |measure, limit| measure >= limit, "must be at least"),
        "max" => bound(rule, present, |measure, limit| measure <= limit, "must be at most"),
        "len" => bound(rule, present, |measure, limit| measure == limit, "must have length"),
        "email" => match present {
            None => Ok(()),
            Some(JsonValue::String(text)) if EMAIL_RE.is_match(text) => Ok(()),
            Some(_) => Err("must be a valid email address".to_string()),
        },
        "fixed" => Ok(()),
        "zerotime" => match present {
            None => Ok(()),
            Some(JsonValue::String(text)) if is_zero_time(text) => Ok(()),
            Some(_) => Err("must not be set by the client".to_string()),
        },
        other => Err(format!("unsupported rule '{}'", other)),
    }
}

fn bound(
    rule: &Rule,
    value: Option<&JsonValue>,
    accept: impl Fn(f64, f64) -> bool,
    phrase: &str,
) -> Result<(), String> {
    let raw = rule.param.as_deref().unwrap_or_default();
    let limit: f64 = raw
        .parse()
        .map_err(|_| format!("rule '{}' has invalid parameter '{}'", rule.key, raw))?;

    let Some(measure) = value.and_then(measure) else {
        return Ok(());
    };
    if accept(measure, limit) {
        Ok(())
    } else {
        Err(format!("{} {}", phrase, raw))
    }
}

/// Length for strings and collections, value for numbers.
fn measure(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::String(text) => Some(text.chars().count() as f64),
        JsonValue::Array(items) => Some(items.len() as f64),
        JsonValue::Object(map) => Some(map.len() as f64),
        JsonValue::Number(number) => number.as_f64(),
        _ => None,
    }
}

fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(text) => text.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn is_zero_time(text: &str) -> bool {
    let Some(zero) = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single() else {
        return false;
    };
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc) == zero)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BindResult;
    use crate::mapping::{FieldValues, Record};
    use serde_json::json;
    use std::sync::OnceLock;

    struct Parent;
    struct Child;

    impl Record for Parent {
        fn descriptor() -> &'static RecordDescriptor {
            static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                RecordDescriptor::builder("Parent")
                    .field(FieldDescriptor::new("X").json_tag("x").validate_tag("required"))
                    .embed::<Child>("Child")
                    .build()
            })
        }

        fn field_values(&self) -> BindResult<FieldValues> {
            Ok(FieldValues::new())
        }
    }

    impl Record for Child {
        fn descriptor() -> &'static RecordDescriptor {
            static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                RecordDescriptor::builder("Child")
                    .field(FieldDescriptor::new("Y").json_tag("y").validate_tag("required"))
                    .embed::<Parent>("Parent")
                    .build()
            })
        }

        fn field_values(&self) -> BindResult<FieldValues> {
            Ok(FieldValues::new())
        }
    }

    fn record() -> RecordDescriptor {
        RecordDescriptor::builder("Account")
            .field(FieldDescriptor::new("Name").json_tag("name").validate_tag("required,min=2,max=8"))
            .field(FieldDescriptor::new("Email").json_tag("email").validate_tag("required,email"))
            .field(FieldDescriptor::new("Code").json_tag("code").validate_tag("len=3"))
            .field(FieldDescriptor::new("Score").json_tag("score").validate_tag("min=0|max=-10"))
            .field(FieldDescriptor::new("CreatedAt").json_tag("created_at").validate_tag("zerotime"))
            .build()
    }

    #[test]
    fn create_checks_every_field() {
        let document = json!({ "name": "A", "code": "abcd", "created_at": "2020-01-01T00:00:00Z" });
        let err = TagValidator::new()
            .validate_for_create(&record(), &document)
            .unwrap_err();

        assert_eq!(err.fields(), vec!["Name", "Email", "Code", "CreatedAt"]);
        let rules: Vec<&str> = err.violations().iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["min", "required", "len", "zerotime"]);
    }

    #[test]
    fn create_accepts_valid_document() {
        let document = json!({
            "name": "Alice",
            "email": "alice@example.com",
            "code": "abc",
            "score": 4,
            "created_at": null
        });
        assert!(TagValidator::new().validate_for_create(&record(), &document).is_ok());
    }

    #[test]
    fn update_ignores_fields_outside_allowed_set() {
        let document = json!({ "name": "Bob" });
        let allowed: BTreeSet<String> = ["Name".to_string()].into_iter().collect();
        assert!(TagValidator::new()
            .validate_for_update(&record(), &document, &allowed)
            .is_ok());

        let allowed: BTreeSet<String> = ["Email".to_string()].into_iter().collect();
        let err = TagValidator::new()
            .validate_for_update(&record(), &document, &allowed)
            .unwrap_err();
        assert_eq!(err.fields(), vec!["Email"]);
    }

    #[test]
    fn alternatives_fail_only_when_all_fail() {
        let allowed: BTreeSet<String> = ["Score".to_string()].into_iter().collect();
        let err = TagValidator::new()
            .validate_for_update(&record(), &json!({ "score": -3 }), &allowed)
            .unwrap_err();
        assert_eq!(err.violations()[0].rule, "min|max");
        assert_eq!(err.violations()[0].message, "must be at least 0 or must be at most -10");
    }

    #[test]
    fn zero_timestamp_counts_as_unset() {
        assert!(is_zero_time("0001-01-01T00:00:00Z"));
        assert!(!is_zero_time("2020-01-01T00:00:00Z"));
        assert!(!is_zero_time("not a time"));
    }

    #[test]
    fn unknown_rule_is_reported() {
        let record = RecordDescriptor::builder("Typo")
            .field(FieldDescriptor::new("Name").json_tag("name").validate_tag("requird"))
            .build();
        let err = TagValidator::new()
            .validate_for_create(&record, &json!({ "name": "x" }))
            .unwrap_err();
        assert_eq!(err.violations()[0].message, "unsupported rule 'requird'");
    }

    #[test]
    fn mutual_embedding_checks_each_record_once() {
        let err = TagValidator::new()
            .validate_for_create(Parent::descriptor(), &json!({}))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["X", "Y"]);
        assert_eq!(err.violations().len(), 2);

        let allowed: BTreeSet<String> = ["X".to_string()].into_iter().collect();
        assert!(TagValidator::new()
            .validate_for_update(Parent::descriptor(), &json!({ "x": "1" }), &allowed)
            .is_ok());
    }
}
