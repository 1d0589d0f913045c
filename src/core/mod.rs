pub mod error;

pub use error::{BindError, BindResult, FieldViolation, ValidationError};
