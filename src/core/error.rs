use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Request body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type BindResult<T> = std::result::Result<T, BindError>;

impl BindError {
    pub fn is_decode(&self) -> bool {
        matches!(self, BindError::Decode(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BindError::Validation(_))
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            BindError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BindError {
    fn from(err: serde_json::Error) -> Self {
        BindError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for BindError {
    fn from(err: std::io::Error) -> Self {
        BindError::Decode(format!("failed to read request body: {}", err))
    }
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Structural field name, as declared on the record.
    pub field: String,
    /// Wire name the client used for the field.
    pub external: String,
    /// Rule key that failed (`required`, `min`, ...).
    pub rule: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        external: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            external: external.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' ({}): {}", self.external, self.rule, self.message)
    }
}

/// Aggregated rule violations for a single record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn single(violation: FieldViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Structural names of every failing field, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::with_capacity(self.violations.len());
        for violation in &self.violations {
            if !fields.contains(&violation.field.as_str()) {
                fields.push(violation.field.as_str());
            }
        }
        fields
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (idx, violation) in self.violations.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}
